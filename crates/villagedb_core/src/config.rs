//! Store configuration and environment resolution.
//!
//! # Invariants
//! - A normalized config never has a zero page size.
//! - The cache slot key belongs to the cache (`SqliteVillageCache::with_key`),
//!   not to the store config.

use crate::search::view::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

/// Environment variable overriding the cache database path.
pub const DB_PATH_ENV: &str = "VILLAGEDB_DB_PATH";
/// Environment variable enabling file logging in binaries.
pub const LOG_DIR_ENV: &str = "VILLAGEDB_LOG_DIR";

const DB_FILE_NAME: &str = "villagedb_cache.sqlite3";

/// Tunables for one [`crate::VillageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Villages per view page.
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Replaces invalid values with defaults.
    pub fn normalized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }
}

/// Resolves the cache database path.
///
/// Uses `VILLAGEDB_DB_PATH` when set and non-blank, otherwise a file in the
/// system temp directory.
pub fn resolve_db_path() -> PathBuf {
    non_blank_env(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME))
}

/// Returns the log directory requested through `VILLAGEDB_LOG_DIR`, if any.
pub fn resolve_log_dir() -> Option<String> {
    non_blank_env(LOG_DIR_ENV)
}

fn non_blank_env(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
