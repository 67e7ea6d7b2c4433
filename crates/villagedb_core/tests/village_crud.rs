use rusqlite::Connection;
use villagedb_core::db::open_db_in_memory;
use villagedb_core::{
    DemographicsPatch, PersistStatus, RepoError, RepoResult, SqliteVillageCache, StoreConfig,
    StoreError, Village, VillageCache, VillageDraft, VillagePatch, VillageStore,
    VillageValidationError, DEFAULT_IMAGE,
};

fn draft(name: &str, tags: &str) -> VillageDraft {
    VillageDraft {
        name: name.to_string(),
        region: "Y".to_string(),
        land_area: "1.2".to_string(),
        latitude: "31.5".to_string(),
        longitude: "34.8".to_string(),
        tags: tags.to_string(),
        image: None,
    }
}

fn seeded_store<'conn>(
    conn: &'conn Connection,
    names: &[&str],
) -> VillageStore<SqliteVillageCache<'conn>> {
    let cache = SqliteVillageCache::try_new(conn).unwrap();
    let mut store = VillageStore::new(cache, StoreConfig::default());
    for name in names {
        store.create(draft(name, "rural")).unwrap();
    }
    store
}

#[test]
fn create_on_empty_store_assigns_id_zero_and_splits_tags() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &[]);

    let created = store
        .create(VillageDraft {
            name: "X".to_string(),
            region: "Y".to_string(),
            land_area: "1.2".to_string(),
            latitude: "31.5".to_string(),
            longitude: "34.8".to_string(),
            tags: "a, b".to_string(),
            image: None,
        })
        .unwrap();

    assert_eq!(created.value.id, 0);
    assert_eq!(created.value.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(created.value.image, DEFAULT_IMAGE);
    assert!(created.value.demographics.is_none());
    assert!(created.is_persisted());
    assert_eq!(store.villages(), &[created.value]);
}

#[test]
fn create_keeps_supplied_image_and_allows_empty_tags() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha"]);

    let created = store
        .create(VillageDraft {
            image: Some("jenin.png".to_string()),
            ..draft("Jenin", "")
        })
        .unwrap();
    assert_eq!(created.value.id, 1);
    assert_eq!(created.value.image, "jenin.png");
    assert!(created.value.tags.is_empty());
}

#[test]
fn create_then_delete_restores_prior_content() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta", "Gamma"]);
    let before = store.villages().to_vec();

    let created = store.create(draft("Delta", "urban")).unwrap();
    assert_eq!(store.len(), 4);
    let removed = store.delete(created.value.id).unwrap();

    assert_eq!(removed.value, created.value);
    assert_eq!(store.villages(), before.as_slice());
    assert_eq!(store.cache().load_cache().unwrap(), Some(before));
}

#[test]
fn create_rejects_missing_required_fields_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha"]);
    let before = store.villages().to_vec();

    for (field, bad) in [
        ("name", VillageDraft { name: "  ".to_string(), ..draft("x", "") }),
        ("region", VillageDraft { region: String::new(), ..draft("x", "") }),
        ("landArea", VillageDraft { land_area: String::new(), ..draft("x", "") }),
        ("latitude", VillageDraft { latitude: String::new(), ..draft("x", "") }),
        ("longitude", VillageDraft { longitude: String::new(), ..draft("x", "") }),
    ] {
        let err = store.create(bad).unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation(VillageValidationError::MissingField(field))
        );
    }

    assert_eq!(store.villages(), before.as_slice());
    assert_eq!(store.cache().load_cache().unwrap(), Some(before));
}

#[test]
fn update_unknown_id_fails_and_leaves_set_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta"]);
    let before = store.villages().to_vec();

    let patch = VillagePatch {
        name: Some("Renamed".to_string()),
        ..VillagePatch::default()
    };
    let err = store.update(42, &patch).unwrap_err();

    assert_eq!(err, StoreError::NotFound(42));
    assert_eq!(store.villages(), before.as_slice());
}

#[test]
fn update_merges_only_present_fields() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta"]);
    let original = store.get(1).cloned().unwrap();

    let updated = store
        .update(
            1,
            &VillagePatch {
                name: Some(" Beta Prime ".to_string()),
                tags: Some(vec![" urban ".to_string(), "".to_string(), "coastal".to_string()]),
                ..VillagePatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.value.name, "Beta Prime");
    assert_eq!(updated.value.tags, vec!["urban", "coastal"]);
    assert_eq!(updated.value.region, original.region);
    assert_eq!(updated.value.latitude, original.latitude);
    assert_eq!(updated.value.image, original.image);
    assert_eq!(store.get(1), Some(&updated.value));
    assert_eq!(store.get(0).map(|village| village.name.as_str()), Some("Alpha"));
}

#[test]
fn full_patch_replaces_every_field_but_keeps_position() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta", "Gamma"]);

    let replacement = Village {
        id: 1,
        name: "Bethany".to_string(),
        region: "Jerusalem".to_string(),
        land_area: "4.75".to_string(),
        latitude: "31.77".to_string(),
        longitude: "35.26".to_string(),
        tags: vec!["historic".to_string()],
        image: "bethany.jpg".to_string(),
        demographics: None,
    };
    store
        .update(1, &VillagePatch::replace_with(&replacement))
        .unwrap();

    assert_eq!(store.villages()[1], replacement);
    let names = store
        .villages()
        .iter()
        .map(|village| village.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alpha", "Bethany", "Gamma"]);
}

#[test]
fn update_rejects_blanking_a_required_field() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha"]);
    let before = store.villages().to_vec();

    let err = store
        .update(
            0,
            &VillagePatch {
                region: Some("   ".to_string()),
                land_area: Some("9".to_string()),
                ..VillagePatch::default()
            },
        )
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::Validation(VillageValidationError::MissingField("region"))
    );
    assert_eq!(store.villages(), before.as_slice());
}

#[test]
fn delete_twice_fails_with_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta"]);

    store.delete(0).unwrap();
    let err = store.delete(0).unwrap_err();

    assert_eq!(err, StoreError::NotFound(0));
    assert_eq!(store.len(), 1);
}

#[test]
fn update_demographics_creates_then_merges() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha"]);
    let before = store.get(0).cloned().unwrap();

    let first = store
        .update_demographics(
            0,
            &DemographicsPatch {
                population_size: Some("1200".to_string()),
                age_distribution: Some("0-14: 30%, 15-64: 60%, 65+: 10%".to_string()),
                ..DemographicsPatch::default()
            },
        )
        .unwrap();
    let demographics = first.value.demographics.clone().unwrap();
    assert_eq!(demographics.population_size, "1200");
    assert_eq!(demographics.gender_ratios, "");

    let second = store
        .update_demographics(
            0,
            &DemographicsPatch {
                gender_ratios: Some("Male: 51%, Female: 49%".to_string()),
                population_growth: Some("2.1%".to_string()),
                ..DemographicsPatch::default()
            },
        )
        .unwrap();
    let merged = second.value.demographics.clone().unwrap();
    assert_eq!(merged.population_size, "1200");
    assert_eq!(merged.age_distribution, "0-14: 30%, 15-64: 60%, 65+: 10%");
    assert_eq!(merged.gender_ratios, "Male: 51%, Female: 49%");
    assert_eq!(merged.population_growth, "2.1%");

    assert_eq!(second.value.name, before.name);
    assert_eq!(second.value.tags, before.tags);
    assert_eq!(
        store.update_demographics(9, &DemographicsPatch::default()).unwrap_err(),
        StoreError::NotFound(9)
    );
}

#[test]
fn every_mutation_is_mirrored_to_the_cache() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &["Alpha", "Beta"]);

    store
        .update(
            0,
            &VillagePatch {
                region: Some("Coast".to_string()),
                ..VillagePatch::default()
            },
        )
        .unwrap();
    store
        .update_demographics(
            1,
            &DemographicsPatch {
                population_size: Some("800".to_string()),
                ..DemographicsPatch::default()
            },
        )
        .unwrap();
    store.delete(0).unwrap();

    let cached = store.cache().load_cache().unwrap().unwrap();
    assert_eq!(cached, store.villages());
}

struct BrokenCache;

impl VillageCache for BrokenCache {
    fn save(&self, _villages: &[Village]) -> RepoResult<()> {
        Err(RepoError::InvalidData("storage quota exceeded".to_string()))
    }

    fn load_cache(&self) -> RepoResult<Option<Vec<Village>>> {
        Ok(None)
    }
}

#[test]
fn persist_failure_is_reported_and_memory_stays_authoritative() {
    let mut store = VillageStore::new(BrokenCache, StoreConfig::default());

    let created = store.create(draft("Alpha", "")).unwrap();
    assert!(!created.is_persisted());
    assert!(matches!(created.persist, PersistStatus::Failed(ref message) if message.contains("quota")));
    assert!(store
        .last_persist_error()
        .unwrap_or_default()
        .contains("quota"));

    assert_eq!(store.len(), 1);
    assert_eq!(store.view().items.len(), 1);
    let second = store.create(draft("Beta", "")).unwrap();
    assert_eq!(second.value.id, 1);
}

#[test]
fn create_after_max_id_fails_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let mut store = seeded_store(&conn, &[]);
    let ticket = store.begin_load();
    let report = store.complete_load(
        ticket,
        Ok(r#"[{"id":9223372036854775807,"name":"Edge","region":"R","landArea":"1","latitude":"1","longitude":"1"}]"#
            .to_string()),
    );
    assert_eq!(report.record_count, 1);
    let before = store.villages().to_vec();

    let err = store.create(draft("Overflow", "")).unwrap_err();

    assert_eq!(err, StoreError::IdSpaceExhausted);
    assert_eq!(store.villages(), before.as_slice());
    assert_eq!(store.cache().load_cache().unwrap(), Some(before));
}

#[test]
fn store_writes_to_the_slot_its_cache_was_opened_with() {
    let conn = open_db_in_memory().unwrap();
    let cache = SqliteVillageCache::with_key(&conn, " villages_v2 ").unwrap();
    assert_eq!(cache.key(), "villages_v2");
    let mut store = VillageStore::new(cache, StoreConfig::default());

    store.create(draft("Alpha", "")).unwrap();

    let other = SqliteVillageCache::try_new(&conn).unwrap();
    assert_eq!(other.load_cache().unwrap(), None);
    assert_eq!(store.cache().load_cache().unwrap().unwrap().len(), 1);
}
