//! Village record store.
//!
//! # Responsibility
//! - Own the authoritative full set and the current view query state.
//! - Orchestrate initial load: remote document, then cache, then empty.
//! - Apply create/update/delete/demographics mutations and mirror every
//!   successful mutation to the durable cache.
//!
//! # Invariants
//! - Ids are unique within the full set.
//! - A failed mutation leaves the full set untouched.
//! - Only the most recently issued load may replace the full set.
//! - While a load is pending the store reads as empty and rejects mutations.
//! - `update` merges at the top level; demographics merge field by field.

use crate::config::StoreConfig;
use crate::model::village::{
    DemographicsPatch, Village, VillageDraft, VillageId, VillagePatch, VillageValidationError,
};
use crate::repo::cache_repo::{RepoError, VillageCache};
use crate::search::view::{
    derive_view, filter_by_name, step_page, total_pages, PageDirection, SortKey, ViewQuery,
    ViewResult,
};
use crate::service::insights::{village_stats, VillageStats};
use crate::source::remote::{decode_villages, SourceError, SourceResult, VillageSource};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Required field missing or blank.
    Validation(VillageValidationError),
    /// No village with this id in the full set.
    NotFound(VillageId),
    /// A load is pending; the full set is about to be replaced.
    LoadInProgress,
    /// The highest id in the full set is `VillageId::MAX`.
    IdSpaceExhausted,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "village not found: {id}"),
            Self::LoadInProgress => write!(f, "villages are still loading"),
            Self::IdSpaceExhausted => write!(f, "no village id left after {}", VillageId::MAX),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::LoadInProgress | Self::IdSpaceExhausted => None,
        }
    }
}

impl From<VillageValidationError> for StoreError {
    fn from(value: VillageValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Outcome of mirroring the full set to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Persisted,
    /// Cache write failed; the in-memory set stays authoritative.
    Failed(String),
}

/// Receipt for one applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<T> {
    /// Created, updated or removed village.
    pub value: T,
    pub persist: PersistStatus,
}

impl<T> Mutation<T> {
    pub fn is_persisted(&self) -> bool {
        self.persist == PersistStatus::Persisted
    }
}

/// Identifies one issued load. Later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Where the full set came from after a load completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Remote,
    Cache,
    /// Neither remote nor cache produced records.
    Empty,
    /// A newer load was issued; this completion was discarded.
    Superseded,
}

/// Why the cache could not serve as fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMiss {
    Missing,
    Empty,
    Corrupted(String),
    Unreadable(String),
}

impl Display for CacheMiss {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no cached villages"),
            Self::Empty => write!(f, "cached villages are empty"),
            Self::Corrupted(message) => write!(f, "cached villages are corrupted: {message}"),
            Self::Unreadable(message) => write!(f, "cache unreadable: {message}"),
        }
    }
}

/// Non-fatal load warning surfaced to callers.
#[derive(Debug)]
pub enum LoadFailure {
    /// Remote failed; villages were recovered from the cache.
    RemoteUnavailable(SourceError),
    /// Remote and cache both failed; the store is empty.
    Exhausted { remote: SourceError, cache: CacheMiss },
}

impl LoadFailure {
    /// Returns whether the store ended without any records.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn remote_error(&self) -> &SourceError {
        match self {
            Self::RemoteUnavailable(remote) | Self::Exhausted { remote, .. } => remote,
        }
    }
}

impl Display for LoadFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteUnavailable(remote) => {
                write!(f, "showing cached villages; {remote}")
            }
            Self::Exhausted { remote, cache } => {
                write!(f, "error loading villages ({remote}; {cache})")
            }
        }
    }
}

impl Error for LoadFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.remote_error())
    }
}

/// Result envelope of one completed load.
#[derive(Debug)]
pub struct LoadReport {
    pub ticket: LoadTicket,
    pub origin: LoadOrigin,
    /// Full-set size after the load was applied (or ignored).
    pub record_count: usize,
    pub failure: Option<LoadFailure>,
    /// Cache write-through status; only set for remote loads.
    pub write_through: Option<PersistStatus>,
}

/// Owned village store over a durable cache implementation.
pub struct VillageStore<C: VillageCache> {
    cache: C,
    config: StoreConfig,
    villages: Vec<Village>,
    search_term: String,
    sort_key: SortKey,
    page: usize,
    issued_loads: u64,
    pending_load: Option<LoadTicket>,
    last_persist_error: Option<String>,
}

impl<C: VillageCache> VillageStore<C> {
    /// Creates an empty store. Call [`Self::load`] to populate it.
    pub fn new(cache: C, config: StoreConfig) -> Self {
        Self {
            cache,
            config: config.normalized(),
            villages: Vec::new(),
            search_term: String::new(),
            sort_key: SortKey::Default,
            page: 1,
            issued_loads: 0,
            pending_load: None,
            last_persist_error: None,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Full set in insertion order. Empty while a load is pending.
    pub fn villages(&self) -> &[Village] {
        if self.is_loading() {
            return &[];
        }
        &self.villages
    }

    pub fn get(&self, id: VillageId) -> Option<&Village> {
        self.villages().iter().find(|village| village.id == id)
    }

    pub fn len(&self) -> usize {
        self.villages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.villages().is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Last cache write error, cleared by the next successful write.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Fetches from `source` and applies the result as the newest load.
    pub fn load(&mut self, source: &impl VillageSource) -> LoadReport {
        let ticket = self.begin_load();
        debug!(
            "event=village_load module=store status=fetch ticket={} source={}",
            ticket.generation(),
            source.location()
        );
        let fetched = source.fetch();
        self.complete_load(ticket, fetched)
    }

    /// Issues a new load ticket, superseding any pending one.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued_loads += 1;
        let ticket = LoadTicket(self.issued_loads);
        if let Some(previous) = self.pending_load.replace(ticket) {
            debug!(
                "event=village_load module=store status=superseded ticket={} by={}",
                previous.generation(),
                ticket.generation()
            );
        }
        ticket
    }

    /// Applies the fetched document for `ticket`.
    ///
    /// Completions for anything but the newest issued ticket are ignored.
    /// Remote failures fall back to the cache, then to an empty set; both
    /// fallbacks are reported through `LoadReport::failure`, never as `Err`.
    pub fn complete_load(&mut self, ticket: LoadTicket, fetched: SourceResult<String>) -> LoadReport {
        if self.pending_load != Some(ticket) {
            info!(
                "event=village_load module=store status=stale ticket={} latest={}",
                ticket.generation(),
                self.issued_loads
            );
            return LoadReport {
                ticket,
                origin: LoadOrigin::Superseded,
                record_count: self.len(),
                failure: None,
                write_through: None,
            };
        }

        self.pending_load = None;
        let started_at = Instant::now();
        let decoded =
            fetched.and_then(|payload| decode_villages(&payload).map_err(SourceError::from));

        let report = match decoded {
            Ok(villages) => {
                self.replace_full_set(villages);
                let status = self.persist();
                LoadReport {
                    ticket,
                    origin: LoadOrigin::Remote,
                    record_count: self.villages.len(),
                    failure: None,
                    write_through: Some(status),
                }
            }
            Err(remote) => {
                warn!(
                    "event=village_load module=store status=fallback ticket={} error={}",
                    ticket.generation(),
                    remote
                );
                match self.read_cache() {
                    Ok(villages) => {
                        self.replace_full_set(villages);
                        LoadReport {
                            ticket,
                            origin: LoadOrigin::Cache,
                            record_count: self.villages.len(),
                            failure: Some(LoadFailure::RemoteUnavailable(remote)),
                            write_through: None,
                        }
                    }
                    Err(cache) => {
                        self.replace_full_set(Vec::new());
                        LoadReport {
                            ticket,
                            origin: LoadOrigin::Empty,
                            record_count: 0,
                            failure: Some(LoadFailure::Exhausted { remote, cache }),
                            write_through: None,
                        }
                    }
                }
            }
        };

        match report.failure.as_ref() {
            Some(failure) if failure.is_exhausted() => warn!(
                "event=village_load module=store status=error ticket={} origin=empty duration_ms={} error_code=load_failure",
                ticket.generation(),
                started_at.elapsed().as_millis()
            ),
            _ => info!(
                "event=village_load module=store status=ok ticket={} origin={:?} records={} duration_ms={}",
                ticket.generation(),
                report.origin,
                report.record_count,
                started_at.elapsed().as_millis()
            ),
        }
        report
    }

    /// Current view query.
    pub fn query(&self) -> ViewQuery {
        ViewQuery {
            search_term: self.search_term.clone(),
            sort_key: self.sort_key,
            page: self.page,
            page_size: self.config.page_size,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Derives the current page. Empty while a load is pending.
    pub fn view(&self) -> ViewResult {
        derive_view(self.villages(), &self.query())
    }

    /// Sets the name filter and returns to page 1.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 1;
    }

    /// Sets the sort key and returns to page 1.
    ///
    /// Selecting [`SortKey::Default`] is a full reset: the search term is
    /// cleared as well, so the view shows the whole set in insertion order.
    pub fn set_sort(&mut self, sort_key: SortKey) {
        if sort_key == SortKey::Default {
            self.search_term.clear();
        }
        self.sort_key = sort_key;
        self.page = 1;
    }

    /// Moves one page; no-op at the first/last page. Returns the new page.
    pub fn navigate(&mut self, direction: PageDirection) -> usize {
        self.page = step_page(self.page, self.current_total_pages(), direction);
        self.page
    }

    /// Dashboard aggregates over the full set.
    pub fn stats(&self) -> VillageStats {
        village_stats(self.villages())
    }

    /// Creates a village with the next free id.
    ///
    /// # Errors
    /// - `Validation` when a required draft field is blank.
    /// - `IdSpaceExhausted` when the highest id is already `VillageId::MAX`.
    /// - `LoadInProgress` while a load is pending.
    pub fn create(&mut self, draft: VillageDraft) -> StoreResult<Mutation<Village>> {
        self.ensure_ready()?;
        let started_at = Instant::now();
        let id = self.next_id().inspect_err(|err| {
            warn!("event=village_create module=store status=error error_code=id_exhausted error={err}");
        })?;
        let village = draft.into_village(id).inspect_err(|err| {
            warn!("event=village_create module=store status=error error_code=validation error={err}");
        })?;

        self.villages.push(village.clone());
        let persist = self.persist();
        info!(
            "event=village_create module=store status=ok id={} records={} duration_ms={}",
            village.id,
            self.villages.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Mutation {
            value: village,
            persist,
        })
    }

    /// Merges `patch` into the village with `id`.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    /// - `Validation` when the patch blanks a required field.
    /// - `LoadInProgress` while a load is pending.
    pub fn update(&mut self, id: VillageId, patch: &VillagePatch) -> StoreResult<Mutation<Village>> {
        self.ensure_ready()?;
        let index = self.position(id)?;
        let mut updated = self.villages[index].clone();
        updated.apply_patch(patch);
        updated.validate().inspect_err(|err| {
            warn!("event=village_update module=store status=error id={id} error_code=validation error={err}");
        })?;

        self.villages[index] = updated.clone();
        let persist = self.persist();
        info!("event=village_update module=store status=ok id={id}");
        Ok(Mutation {
            value: updated,
            persist,
        })
    }

    /// Merges `patch` into the village's demographics, creating them if
    /// absent. Other fields stay untouched.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    /// - `LoadInProgress` while a load is pending.
    pub fn update_demographics(
        &mut self,
        id: VillageId,
        patch: &DemographicsPatch,
    ) -> StoreResult<Mutation<Village>> {
        self.ensure_ready()?;
        let index = self.position(id)?;
        let village = &mut self.villages[index];
        village
            .demographics
            .get_or_insert_with(Default::default)
            .merge(patch);
        let updated = village.clone();

        let persist = self.persist();
        info!("event=village_demographics module=store status=ok id={id}");
        Ok(Mutation {
            value: updated,
            persist,
        })
    }

    /// Removes the village with `id` and returns it.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent, including a repeated delete.
    /// - `LoadInProgress` while a load is pending.
    pub fn delete(&mut self, id: VillageId) -> StoreResult<Mutation<Village>> {
        self.ensure_ready()?;
        let index = self.position(id)?;
        let removed = self.villages.remove(index);
        self.page = self.page.min(self.current_total_pages());

        let persist = self.persist();
        info!(
            "event=village_delete module=store status=ok id={id} records={}",
            self.villages.len()
        );
        Ok(Mutation {
            value: removed,
            persist,
        })
    }

    fn ensure_ready(&self) -> StoreResult<()> {
        if self.is_loading() {
            return Err(StoreError::LoadInProgress);
        }
        Ok(())
    }

    fn position(&self, id: VillageId) -> StoreResult<usize> {
        self.villages
            .iter()
            .position(|village| village.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn next_id(&self) -> StoreResult<VillageId> {
        match self.villages.iter().map(|village| village.id).max() {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or(StoreError::IdSpaceExhausted),
        }
    }

    fn current_total_pages(&self) -> usize {
        let matched = filter_by_name(self.villages(), &self.search_term).len();
        total_pages(matched, self.config.page_size)
    }

    fn replace_full_set(&mut self, villages: Vec<Village>) {
        self.villages = villages;
        self.page = 1;
    }

    fn read_cache(&self) -> Result<Vec<Village>, CacheMiss> {
        let villages = match self.cache.load_cache() {
            Ok(Some(villages)) => villages,
            Ok(None) => return Err(CacheMiss::Missing),
            Err(RepoError::InvalidData(message)) => return Err(CacheMiss::Corrupted(message)),
            Err(err) => return Err(CacheMiss::Unreadable(err.to_string())),
        };
        if villages.is_empty() {
            return Err(CacheMiss::Empty);
        }

        let mut seen = HashSet::with_capacity(villages.len());
        if let Some(duplicate) = villages.iter().find(|village| !seen.insert(village.id)) {
            return Err(CacheMiss::Corrupted(format!(
                "duplicate village id {}",
                duplicate.id
            )));
        }
        Ok(villages)
    }

    fn persist(&mut self) -> PersistStatus {
        match self.cache.save(&self.villages) {
            Ok(()) => {
                self.last_persist_error = None;
                PersistStatus::Persisted
            }
            Err(err) => {
                warn!(
                    "event=cache_persist module=store status=error records={} error_code=persist_failed error={err}",
                    self.villages.len()
                );
                let message = err.to_string();
                self.last_persist_error = Some(message.clone());
                PersistStatus::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadOrigin, StoreError, VillageStore};
    use crate::config::StoreConfig;
    use crate::model::village::{Village, VillageDraft};
    use crate::repo::cache_repo::{RepoResult, VillageCache};
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryCache {
        slot: RefCell<Option<Vec<Village>>>,
    }

    impl VillageCache for MemoryCache {
        fn save(&self, villages: &[Village]) -> RepoResult<()> {
            *self.slot.borrow_mut() = Some(villages.to_vec());
            Ok(())
        }

        fn load_cache(&self) -> RepoResult<Option<Vec<Village>>> {
            Ok(self.slot.borrow().clone())
        }
    }

    fn draft(name: &str) -> VillageDraft {
        VillageDraft {
            name: name.to_string(),
            region: "North".to_string(),
            land_area: "3.5".to_string(),
            latitude: "32.1".to_string(),
            longitude: "35.2".to_string(),
            tags: "rural".to_string(),
            image: None,
        }
    }

    #[test]
    fn reads_are_empty_and_mutations_rejected_while_loading() {
        let mut store = VillageStore::new(MemoryCache::default(), StoreConfig::default());
        store.create(draft("Alpha")).expect("create before load");

        let ticket = store.begin_load();
        assert!(store.is_loading());
        assert!(store.villages().is_empty());
        assert!(store.view().items.is_empty());
        assert_eq!(store.view().total_pages, 1);
        assert_eq!(
            store.create(draft("Beta")).unwrap_err(),
            StoreError::LoadInProgress
        );

        let report = store.complete_load(ticket, Ok("[]".to_string()));
        assert_eq!(report.origin, LoadOrigin::Remote);
        assert!(!store.is_loading());
    }

    #[test]
    fn next_id_follows_max_not_count() {
        let mut store = VillageStore::new(MemoryCache::default(), StoreConfig::default());
        let ticket = store.begin_load();
        store.complete_load(
            ticket,
            Ok(r#"[{"id": 7, "name": "A", "region": "R", "landArea": "1", "latitude": "1", "longitude": "1"}]"#
                .to_string()),
        );

        let created = store.create(draft("B")).expect("create");
        assert_eq!(created.value.id, 8);
        assert!(created.is_persisted());
    }
}
