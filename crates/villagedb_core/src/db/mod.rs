//! SQLite storage for the durable village cache.
//!
//! # Responsibility
//! - Open the cache database file (or an in-memory one) and bring its
//!   `cache_slots` schema up to date.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Cache slots are only touched through connections returned here.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The cache database at `location` could not be opened.
    Open {
        location: String,
        source: rusqlite::Error,
    },
    /// Statement or pragma failure on an open cache connection.
    Sqlite(rusqlite::Error),
    /// The cache file was migrated by a newer build.
    CacheSchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "cannot open village cache at {location}: {source}")
            }
            Self::Sqlite(err) => write!(f, "village cache query failed: {err}"),
            Self::CacheSchemaTooNew { found, supported } => write!(
                f,
                "village cache schema v{found} is newer than this build (max v{supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::CacheSchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
