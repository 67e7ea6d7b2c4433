//! Durable village cache contracts and SQLite implementation.
//!
//! # Responsibility
//! - Mirror the full village set into one keyed cache slot.
//! - Read the most recent snapshot back for load fallback.
//!
//! # Invariants
//! - `save` overwrites the whole slot; there is no versioning or merge.
//! - Read paths report undecodable snapshots as `InvalidData` instead of
//!   masking them; callers decide how to degrade.

use crate::db::DbError;
use crate::model::village::Village;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default slot name for the village snapshot.
pub const DEFAULT_CACHE_KEY: &str = "villages";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for cache persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Snapshot could not be encoded for storage.
    Encode(serde_json::Error),
    /// Stored snapshot is not a valid JSON array of villages.
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode cache snapshot: {err}"),
            Self::InvalidData(message) => write!(f, "invalid cached village data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable mirror of the full village set.
pub trait VillageCache {
    /// Serializes `villages` and overwrites the snapshot.
    fn save(&self, villages: &[Village]) -> RepoResult<()>;
    /// Returns the last snapshot, or `None` when nothing was ever saved.
    fn load_cache(&self) -> RepoResult<Option<Vec<Village>>>;
}

impl<C: VillageCache + ?Sized> VillageCache for &C {
    fn save(&self, villages: &[Village]) -> RepoResult<()> {
        (**self).save(villages)
    }

    fn load_cache(&self) -> RepoResult<Option<Vec<Village>>> {
        (**self).load_cache()
    }
}

/// SQLite-backed cache storing one JSON snapshot per slot key.
pub struct SqliteVillageCache<'conn> {
    conn: &'conn Connection,
    key: String,
}

impl<'conn> SqliteVillageCache<'conn> {
    /// Constructs a cache over a migrated connection using the default slot.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_key(conn, DEFAULT_CACHE_KEY)
    }

    /// Constructs a cache over a migrated connection using `key` as slot.
    ///
    /// The key is trimmed; a blank key falls back to [`DEFAULT_CACHE_KEY`].
    ///
    /// # Errors
    /// - `MissingRequiredTable` when migrations were not applied.
    pub fn with_key(conn: &'conn Connection, key: &str) -> RepoResult<Self> {
        if !table_exists(conn, "cache_slots")? {
            return Err(RepoError::MissingRequiredTable("cache_slots"));
        }
        let key = match key.trim() {
            "" => DEFAULT_CACHE_KEY,
            trimmed => trimmed,
        };
        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }

    /// Slot name this cache reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes the snapshot. Missing slots are not an error.
    pub fn clear(&self) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM cache_slots WHERE key = ?1;",
            [self.key.as_str()],
        )?;
        Ok(())
    }
}

impl VillageCache for SqliteVillageCache<'_> {
    fn save(&self, villages: &[Village]) -> RepoResult<()> {
        let payload = serde_json::to_string(villages).map_err(RepoError::Encode)?;
        self.conn.execute(
            "INSERT INTO cache_slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key.as_str(), payload],
        )?;
        debug!(
            "event=cache_save module=repo status=ok key={} records={} bytes={}",
            self.key,
            villages.len(),
            payload.len()
        );
        Ok(())
    }

    fn load_cache(&self) -> RepoResult<Option<Vec<Village>>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM cache_slots WHERE key = ?1;",
                [self.key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<Village>>(&payload) {
            Ok(villages) => Ok(Some(villages)),
            Err(err) => {
                warn!(
                    "event=cache_load module=repo status=error key={} error_code=cache_corrupted",
                    self.key
                );
                Err(RepoError::InvalidData(err.to_string()))
            }
        }
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
