use chrono::NaiveDate;
use plansync_core::model::item::Cadence;
use plansync_core::{
    Bucket, ItemDraft, MemorySnapshotCache, PlannerError, PlannerService, RecurrenceError,
    SnapshotStore,
};
use std::collections::HashSet;

fn service() -> PlannerService {
    let mut store = SnapshotStore::new(Box::new(MemorySnapshotCache::new()));
    store.hydrate();
    PlannerService::new(store)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn weekly_series_covers_one_year_in_one_group() {
    let mut service = service();
    let ids = service
        .create_recurring_item(ItemDraft::new("Team sync"), "2025-01-06", "weekly")
        .unwrap();
    assert_eq!(ids.len(), 53);

    let snapshot = service.snapshot();
    let series: Vec<_> = ids.iter().map(|id| snapshot.item(*id).unwrap()).collect();
    let groups: HashSet<_> = series.iter().map(|item| item.recurrence_group_id).collect();
    assert_eq!(groups.len(), 1);
    assert!(groups.iter().all(Option::is_some));

    assert_eq!(series[0].scheduled_date, Some(date(2025, 1, 6)));
    assert_eq!(series[52].scheduled_date, Some(date(2026, 1, 5)));
    assert!(series.iter().all(|item| {
        item.recurrence_cadence == Some(Cadence::Weekly)
            && item.recurrence_start_date == Some(date(2025, 1, 6))
            && item.validate().is_ok()
    }));
}

#[test]
fn monthly_series_clamps_to_month_end_and_returns_to_the_31st() {
    let mut service = service();
    let ids = service
        .create_recurring_item(ItemDraft::new("Pay rent"), "2025-01-31", "monthly")
        .unwrap();
    let snapshot = service.snapshot();
    let dates: Vec<_> = ids
        .iter()
        .map(|id| snapshot.item(*id).unwrap().scheduled_date.unwrap())
        .collect();

    assert_eq!(dates.len(), 12);
    assert_eq!(dates[1], date(2025, 2, 28));
    assert_eq!(dates[2], date(2025, 3, 31));
    assert_eq!(dates[11], date(2025, 12, 31));
}

#[test]
fn due_date_keeps_its_distance_from_each_occurrence() {
    let mut service = service();
    let ids = service
        .create_recurring_item(
            ItemDraft::new("Report").due_on(date(2025, 1, 8)),
            "2025-01-06",
            "weekly",
        )
        .unwrap();
    let snapshot = service.snapshot();
    let second = snapshot.item(ids[1]).unwrap();
    assert_eq!(second.scheduled_date, Some(date(2025, 1, 13)));
    assert_eq!(second.due_date, Some(date(2025, 1, 15)));
}

#[test]
fn none_cadence_creates_one_ungrouped_item() {
    let mut service = service();
    let ids = service
        .create_recurring_item(ItemDraft::new("Dentist"), "2025-04-02", "none")
        .unwrap();
    assert_eq!(ids.len(), 1);
    let item = service.snapshot().item(ids[0]).cloned().unwrap();
    assert!(!item.is_recurring());
    assert_eq!(item.bucket(), Bucket::Day(date(2025, 4, 2)));
}

#[test]
fn each_occurrence_lands_at_the_end_of_its_day() {
    let mut service = service();
    let monday = date(2025, 1, 13);
    service
        .create_item(ItemDraft::new("Already there").scheduled_on(monday))
        .unwrap();
    service
        .create_recurring_item(ItemDraft::new("Standup"), "2025-01-06", "weekly")
        .unwrap();

    let titles: Vec<_> = service
        .items_in_bucket(Bucket::Day(monday))
        .into_iter()
        .map(|item| (item.title, item.order_index))
        .collect();
    assert_eq!(
        titles,
        vec![
            ("Already there".to_string(), 1),
            ("Standup".to_string(), 2)
        ]
    );
}

#[test]
fn bad_input_creates_nothing() {
    let mut service = service();
    let before = service.snapshot();

    let err = service
        .create_recurring_item(ItemDraft::new("x"), "06/01/2025", "weekly")
        .unwrap_err();
    assert_eq!(
        err,
        PlannerError::Recurrence(RecurrenceError::InvalidStartDate("06/01/2025".to_string()))
    );
    let err = service
        .create_recurring_item(ItemDraft::new("x"), "2025-01-06", "fortnightly")
        .unwrap_err();
    assert_eq!(
        err,
        PlannerError::Recurrence(RecurrenceError::UnknownCadence("fortnightly".to_string()))
    );

    assert_eq!(*service.snapshot(), *before);
}
