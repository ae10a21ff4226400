//! Snapshot diffing.
//!
//! # Responsibility
//! - Turn a `(previous, next)` snapshot pair into per-table upserts and
//!   deletions.
//!
//! # Invariants
//! - `reconcile(s, s)` is empty for every snapshot `s`.
//! - Mutable tables upsert new or changed rows (deep value comparison) and
//!   delete ids that disappeared.
//! - Append-only tables only insert ids new to `next`.
//! - Pure: no I/O, no clock.

use crate::model::snapshot::Snapshot;
use crate::sync::remote::{RemoteRow, RemoteTable};
use crate::sync::rows::{to_row, ProfileRow, SyncRecord};
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Changes for one remote table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableChanges {
    pub upserts: Vec<RemoteRow>,
    pub deletions: Vec<String>,
}

impl TableChanges {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }
}

/// Per-table changes; tables without changes are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    tables: BTreeMap<RemoteTable, TableChanges>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, table: RemoteTable) -> Option<&TableChanges> {
        self.tables.get(&table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (RemoteTable, &TableChanges)> {
        self.tables.iter().map(|(table, changes)| (*table, changes))
    }

    pub fn into_tables(self) -> impl Iterator<Item = (RemoteTable, TableChanges)> {
        self.tables.into_iter()
    }

    pub fn upsert_count(&self) -> usize {
        self.tables.values().map(|changes| changes.upserts.len()).sum()
    }

    pub fn deletion_count(&self) -> usize {
        self.tables.values().map(|changes| changes.deletions.len()).sum()
    }

    fn record(&mut self, table: RemoteTable, changes: TableChanges) {
        if !changes.is_empty() {
            self.tables.insert(table, changes);
        }
    }
}

/// Computes the remote changes that turn `previous` into `next`.
pub fn reconcile(previous: &Snapshot, next: &Snapshot, account_id: &str) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    let before = ProfileRow::from_snapshot(previous, account_id);
    let after = ProfileRow::from_snapshot(next, account_id);
    plan.record(
        RemoteTable::Profiles,
        diff_mutable(&[before], &[after], account_id),
    );

    plan.record(
        RemoteTable::Items,
        diff_mutable(&previous.items, &next.items, account_id),
    );
    plan.record(
        RemoteTable::Habits,
        diff_mutable(&previous.habits, &next.habits, account_id),
    );
    plan.record(
        RemoteTable::HabitLogs,
        diff_mutable(&previous.habit_logs, &next.habit_logs, account_id),
    );
    plan.record(
        RemoteTable::Goals,
        diff_mutable(&previous.goals, &next.goals, account_id),
    );

    plan.record(
        RemoteTable::Reflections,
        diff_append_only(&previous.reflections, &next.reflections, account_id),
    );
    plan.record(
        RemoteTable::LifeAreaScores,
        diff_append_only(
            &previous.life_area_scores,
            &next.life_area_scores,
            account_id,
        ),
    );
    plan.record(
        RemoteTable::Messages,
        diff_append_only(&previous.messages, &next.messages, account_id),
    );

    plan
}

fn encode<T: SyncRecord>(record: &T, account_id: &str) -> Option<RemoteRow> {
    match to_row(record, account_id) {
        Ok(row) => Some(row),
        Err(err) => {
            warn!(
                "event=sync_encode module=sync status=error table={} id={} error={err}",
                T::TABLE,
                record.record_id()
            );
            None
        }
    }
}

fn diff_mutable<T: SyncRecord>(previous: &[T], next: &[T], account_id: &str) -> TableChanges {
    if previous == next {
        return TableChanges::default();
    }

    let before: HashMap<String, RemoteRow> = previous
        .iter()
        .filter_map(|record| Some((record.record_id(), encode(record, account_id)?)))
        .collect();

    let mut changes = TableChanges::default();
    let mut seen = HashSet::with_capacity(next.len());
    for record in next {
        let id = record.record_id();
        seen.insert(id.clone());
        let Some(row) = encode(record, account_id) else {
            continue;
        };
        if before.get(&id) != Some(&row) {
            changes.upserts.push(row);
        }
    }

    changes.deletions = previous
        .iter()
        .map(SyncRecord::record_id)
        .filter(|id| !seen.contains(id))
        .collect();
    changes
}

fn diff_append_only<T: SyncRecord>(previous: &[T], next: &[T], account_id: &str) -> TableChanges {
    if previous == next {
        return TableChanges::default();
    }

    let known: HashSet<String> = previous.iter().map(SyncRecord::record_id).collect();
    TableChanges {
        upserts: next
            .iter()
            .filter(|record| !known.contains(&record.record_id()))
            .filter_map(|record| encode(record, account_id))
            .collect(),
        deletions: Vec::new(),
    }
}
