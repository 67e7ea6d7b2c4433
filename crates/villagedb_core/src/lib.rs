//! Core record store for village data.
//! This crate is the single source of truth for village invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod source;

pub use config::{resolve_db_path, resolve_log_dir, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::village::{
    Demographics, DemographicsPatch, Village, VillageDraft, VillageId, VillagePatch,
    VillageValidationError, DEFAULT_IMAGE,
};
pub use repo::cache_repo::{
    RepoError, RepoResult, SqliteVillageCache, VillageCache, DEFAULT_CACHE_KEY,
};
pub use search::view::{derive_view, PageDirection, SortKey, ViewQuery, ViewResult};
pub use service::insights::{
    map_markers, population_series, village_stats, MapMarker, PopulationPoint, VillageStats,
};
pub use service::village_store::{
    CacheMiss, LoadFailure, LoadOrigin, LoadReport, LoadTicket, Mutation, PersistStatus,
    StoreError, StoreResult, VillageStore,
};
pub use source::remote::{
    decode_villages, FileSource, FormatError, SourceError, SourceResult, VillageSource,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
