use rusqlite::Connection;
use villagedb_core::db::migrations::latest_version;
use villagedb_core::db::{open_db, open_db_in_memory, DbError};
use villagedb_core::{SqliteVillageCache, VillageCache};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cache_slots");
}

#[test]
fn reopening_file_keeps_schema_and_cached_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("villages.db");

    {
        let conn = open_db(&path).unwrap();
        let cache = SqliteVillageCache::try_new(&conn).unwrap();
        cache.save(&[]).unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let cache = SqliteVillageCache::try_new(&conn).unwrap();
    assert_eq!(cache.load_cache().unwrap(), Some(Vec::new()));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::CacheSchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

#[test]
fn unopenable_path_names_the_cache_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("cache.db");

    let err = open_db(&path).unwrap_err();

    assert!(matches!(err, DbError::Open { .. }));
    assert!(err.to_string().contains("missing_dir"));
}
