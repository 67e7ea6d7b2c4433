//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load villages from a JSON fixture (or the cache fallback) and print the
//!   first page plus dashboard counters.
//! - Verify `villagedb_core` wiring without any UI runtime.
//!
//! Usage: `villagedb_cli [fixture.json]` (default `v.json`).

use log::warn;
use std::process::ExitCode;
use villagedb_core::db::open_db;
use villagedb_core::{
    default_log_level, init_logging, resolve_db_path, resolve_log_dir, FileSource, LoadOrigin,
    SqliteVillageCache, StoreConfig, VillageStore, DEFAULT_CACHE_KEY,
};

const DEFAULT_FIXTURE: &str = "v.json";

fn main() -> ExitCode {
    if let Some(log_dir) = resolve_log_dir() {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("villagedb_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_FIXTURE.to_string());
    let source = FileSource::new(fixture);
    let db_path = resolve_db_path();

    let conn = open_db(&db_path)?;
    let cache = SqliteVillageCache::with_key(&conn, DEFAULT_CACHE_KEY)?;
    let mut store = VillageStore::new(cache, StoreConfig::default());

    let report = store.load(&source);
    println!("villagedb_core version={}", villagedb_core::core_version());
    println!(
        "load origin={:?} records={} source={} cache={}",
        report.origin,
        report.record_count,
        source.path().display(),
        db_path.display()
    );
    if let Some(failure) = report.failure.as_ref() {
        warn!("event=cli_load module=cli status=degraded error={failure}");
        println!("warning: {failure}");
    }
    if report.origin == LoadOrigin::Empty {
        return Ok(());
    }

    let view = store.view();
    println!(
        "page {}/{} ({} villages, sort={}, prev={}, next={})",
        view.page,
        view.total_pages,
        view.matched,
        store.sort_key().as_str(),
        view.has_prev(),
        view.has_next()
    );
    for village in &view.items {
        println!(
            "  #{:<4} {:<24} {:<16} tags=[{}]",
            village.id,
            village.name,
            village.region,
            village.tags.join(", ")
        );
    }

    let stats = store.stats();
    println!(
        "total={} urban={} population={} avg_land_area={:.2} sq km",
        stats.total_villages, stats.urban_areas, stats.total_population, stats.avg_land_area
    );
    Ok(())
}
