use chrono::NaiveDate;
use plansync_core::schedule::order::is_partitioned;
use plansync_core::{
    Bucket, ItemDraft, ItemId, ItemStatus, MemorySnapshotCache, PlannerService, SnapshotStore,
};
use proptest::prelude::*;

fn empty_service() -> PlannerService {
    let mut store = SnapshotStore::new(Box::new(MemorySnapshotCache::new()));
    store.hydrate();
    let mut service = PlannerService::new(store);
    let seeded: Vec<ItemId> = service.snapshot().items.iter().map(|item| item.id).collect();
    for id in seeded {
        service.delete_item(id).unwrap();
    }
    service
}

fn day() -> Bucket {
    Bucket::Day(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
}

fn add(service: &mut PlannerService, title: &str) -> ItemId {
    let date = day().date().unwrap();
    service
        .create_item(ItemDraft::new(title).scheduled_on(date))
        .unwrap()
}

fn layout(service: &PlannerService, bucket: Bucket) -> Vec<(String, i64, bool)> {
    service
        .items_in_bucket(bucket)
        .into_iter()
        .map(|item| (item.title.clone(), item.order_index, item.is_completed()))
        .collect()
}

#[test]
fn completing_the_first_item_sinks_it_below_pending_work() {
    let mut service = empty_service();
    let a = add(&mut service, "A");
    add(&mut service, "B");

    service.toggle_item_complete(a).unwrap();
    assert_eq!(
        layout(&service, day()),
        vec![("B".to_string(), 1, false), ("A".to_string(), 2, true)]
    );

    assert_eq!(service.toggle_item_complete(a).unwrap(), ItemStatus::Pending);
    assert_eq!(
        layout(&service, day()),
        vec![("B".to_string(), 1, false), ("A".to_string(), 2, false)]
    );
}

#[test]
fn cancelled_items_keep_their_manual_position() {
    let mut service = empty_service();
    let a = add(&mut service, "A");
    add(&mut service, "B");

    service.set_item_status(a, ItemStatus::Cancelled).unwrap();
    assert_eq!(
        layout(&service, day()),
        vec![("A".to_string(), 1, false), ("B".to_string(), 2, false)]
    );
}

#[test]
fn reorder_is_clamped_to_the_items_partition() {
    let mut service = empty_service();
    let a = add(&mut service, "A");
    add(&mut service, "B");
    let c = add(&mut service, "C");
    service.toggle_item_complete(a).unwrap();

    service.reorder_item(c, 99).unwrap();
    assert_eq!(
        layout(&service, day()),
        vec![
            ("B".to_string(), 1, false),
            ("C".to_string(), 2, false),
            ("A".to_string(), 3, true)
        ]
    );

    service.reorder_item(a, 0).unwrap();
    service.reorder_item(c, 0).unwrap();
    assert_eq!(
        layout(&service, day()),
        vec![
            ("C".to_string(), 1, false),
            ("B".to_string(), 2, false),
            ("A".to_string(), 3, true)
        ]
    );
}

#[test]
fn moving_between_buckets_renumbers_both() {
    let mut service = empty_service();
    let a = add(&mut service, "A");
    add(&mut service, "B");
    add(&mut service, "C");
    service.create_item(ItemDraft::new("Backlog")).unwrap();

    service.move_item(a, Bucket::Unscheduled, Some(0)).unwrap();

    assert_eq!(
        layout(&service, day()),
        vec![("B".to_string(), 1, false), ("C".to_string(), 2, false)]
    );
    assert_eq!(
        layout(&service, Bucket::Unscheduled),
        vec![("A".to_string(), 1, false), ("Backlog".to_string(), 2, false)]
    );
    assert_eq!(service.snapshot().item(a).unwrap().scheduled_date, None);
}

#[test]
fn moving_past_the_due_date_is_allowed() {
    let mut service = empty_service();
    let due = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    let id = service
        .create_item(ItemDraft::new("Taxes").due_on(due))
        .unwrap();
    let later = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

    service.move_item(id, Bucket::Day(later), None).unwrap();
    let item = service.snapshot().item(id).cloned().unwrap();
    assert_eq!(item.scheduled_date, Some(later));
    assert_eq!(item.due_date, Some(due));
    assert_eq!(item.order_index, 1);
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Toggle(usize),
    Reorder(usize, usize),
    Cancel(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        (0usize..8).prop_map(Op::Toggle),
        (0usize..8, 0usize..10).prop_map(|(index, target)| Op::Reorder(index, target)),
        (0usize..8).prop_map(Op::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_edit_sequence_keeps_pending_above_done(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut service = empty_service();
        let mut ids = vec![add(&mut service, "seed")];
        for op in ops {
            match op {
                Op::Add => ids.push(add(&mut service, "n")),
                Op::Toggle(index) => {
                    service.toggle_item_complete(ids[index % ids.len()]).unwrap();
                }
                Op::Reorder(index, target) => {
                    service.reorder_item(ids[index % ids.len()], target).unwrap();
                }
                Op::Cancel(index) => {
                    service
                        .set_item_status(ids[index % ids.len()], ItemStatus::Cancelled)
                        .unwrap();
                }
            }
            let bucket = service.items_in_bucket(day());
            prop_assert!(is_partitioned(bucket.as_slice()));
            let indexes: Vec<i64> = bucket.iter().map(|item| item.order_index).collect();
            let expected: Vec<i64> = (1..=bucket.len() as i64).collect();
            prop_assert_eq!(indexes, expected);
        }
    }
}
