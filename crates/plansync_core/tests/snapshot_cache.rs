use chrono::NaiveDate;
use plansync_core::model::journal::ReflectionContent;
use plansync_core::repo::snapshot_cache::{decode_snapshot, encode_snapshot};
use plansync_core::{
    ChatRole, EngineConfig, HabitCadence, HydrationSource, ItemDraft, LifeArea,
    MemorySnapshotCache, PlannerEngine, PlannerService, Snapshot, SnapshotCache, SnapshotStore,
    SqliteSnapshotCache,
};
use proptest::prelude::*;

fn hydrated(cache: Box<dyn SnapshotCache>) -> SnapshotStore {
    let mut store = SnapshotStore::new(cache);
    store.hydrate();
    store
}

#[test]
fn edits_survive_a_restart_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    let id = {
        let cache = SqliteSnapshotCache::open(&path, "plansync.snapshot.v1").unwrap();
        let mut service = PlannerService::new(hydrated(Box::new(cache)));
        service.create_item(ItemDraft::new("Persist me")).unwrap()
    };

    let cache = SqliteSnapshotCache::open(&path, "plansync.snapshot.v1").unwrap();
    let mut store = SnapshotStore::new(Box::new(cache));
    assert_eq!(store.hydrate(), HydrationSource::Cache);
    assert_eq!(
        store.snapshot().item(id).map(|item| item.title.as_str()),
        Some("Persist me")
    );
}

#[test]
fn engine_reopens_cache_file_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        cache_path: Some(dir.path().join("engine.db")),
        ..EngineConfig::default()
    };

    let mut engine = PlannerEngine::open_local(&config).unwrap();
    assert_eq!(
        engine.service().store().hydrated_from(),
        Some(HydrationSource::Seeded)
    );
    let goal = engine
        .service_mut()
        .create_goal("Run a 10k", None)
        .unwrap();
    drop(engine);

    let engine = PlannerEngine::open_local(&config).unwrap();
    assert_eq!(
        engine.service().store().hydrated_from(),
        Some(HydrationSource::Cache)
    );
    assert!(engine.service().snapshot().goal(goal).is_some());
}

#[test]
fn corrupt_or_future_cache_falls_back_to_seeded() {
    for payload in [
        "{ not json",
        "{\"version\":2,\"snapshot\":{}}",
        "{\"snapshot\":{}}",
    ] {
        let cache = MemorySnapshotCache::with_payload(payload);
        let mut store = SnapshotStore::new(Box::new(cache.clone()));
        assert_eq!(store.hydrate(), HydrationSource::Seeded, "payload {payload}");
        assert_eq!(*store.snapshot(), Snapshot::seeded());
        assert_eq!(cache.contents().as_deref(), Some(payload));
    }
}

#[test]
fn older_blobs_without_new_collections_still_load() {
    let payload = r#"{"version":1,"snapshot":{"items":[],"habits":[]}}"#;
    let snapshot = decode_snapshot(payload).unwrap();
    assert!(snapshot.items.is_empty());
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.settings, Default::default());
}

#[derive(Debug, Clone)]
enum Edit {
    Item(u8),
    Scheduled(u8, u32),
    Toggle(u8),
    Habit(u8),
    HabitToggle(u8, u32),
    Reflection(u32),
    Score(u8),
    Message(u8),
    Delete(u8),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        any::<u8>().prop_map(Edit::Item),
        (any::<u8>(), 1u32..28).prop_map(|(n, d)| Edit::Scheduled(n, d)),
        any::<u8>().prop_map(Edit::Toggle),
        any::<u8>().prop_map(Edit::Habit),
        (any::<u8>(), 1u32..28).prop_map(|(n, d)| Edit::HabitToggle(n, d)),
        (1u32..28).prop_map(Edit::Reflection),
        (1u8..=10).prop_map(Edit::Score),
        any::<u8>().prop_map(Edit::Message),
        any::<u8>().prop_map(Edit::Delete),
    ]
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
}

fn apply(service: &mut PlannerService, edit: Edit) {
    let snapshot = service.snapshot();
    let pick_item = |n: u8| {
        (!snapshot.items.is_empty()).then(|| snapshot.items[n as usize % snapshot.items.len()].id)
    };
    let pick_habit = |n: u8| {
        (!snapshot.habits.is_empty())
            .then(|| snapshot.habits[n as usize % snapshot.habits.len()].id)
    };
    match edit {
        Edit::Item(n) => {
            service.create_item(ItemDraft::new(format!("item {n}"))).unwrap();
        }
        Edit::Scheduled(n, d) => {
            service
                .create_item(ItemDraft::new(format!("day {n}")).scheduled_on(day(d)))
                .unwrap();
        }
        Edit::Toggle(n) => {
            if let Some(id) = pick_item(n) {
                service.toggle_item_complete(id).unwrap();
            }
        }
        Edit::Habit(n) => {
            service
                .create_habit(&format!("habit {n}"), HabitCadence::Daily)
                .unwrap();
        }
        Edit::HabitToggle(n, d) => {
            if let Some(id) = pick_habit(n) {
                service.toggle_habit_on(id, day(d)).unwrap();
            }
        }
        Edit::Reflection(d) => {
            service.add_reflection(
                day(d),
                ReflectionContent::Monthly {
                    summary: "steady".to_string(),
                    proudest_moment: "\"quoted\" & unicode ✓".to_string(),
                    next_month_intention: String::new(),
                },
            );
        }
        Edit::Score(score) => {
            service
                .add_life_area_score(day(1), LifeArea::Health, score)
                .unwrap();
        }
        Edit::Message(n) => {
            service.append_message(ChatRole::User, format!("hello {n}"));
        }
        Edit::Delete(n) => {
            if let Some(id) = pick_item(n) {
                service.delete_item(id).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn reachable_snapshots_roundtrip_through_cache(edits in prop::collection::vec(edit_strategy(), 1..25)) {
        let cache = MemorySnapshotCache::new();
        let mut service = PlannerService::new(hydrated(Box::new(cache.clone())));
        for edit in edits {
            apply(&mut service, edit);
        }

        let snapshot = service.snapshot();
        let decoded = decode_snapshot(&encode_snapshot(&snapshot).unwrap()).unwrap();
        prop_assert_eq!(&decoded, &*snapshot);

        let mut reopened = SnapshotStore::new(Box::new(cache));
        let source = reopened.hydrate();
        prop_assert_eq!(source, HydrationSource::Cache);
        prop_assert_eq!(&*reopened.snapshot(), &*snapshot);
    }
}
