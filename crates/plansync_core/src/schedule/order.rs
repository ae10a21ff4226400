//! Manual ordering inside a bucket.
//!
//! # Responsibility
//! - Re-sequence `order_index` values after drag-and-drop, completion
//!   toggles and cross-bucket moves.
//! - Provide the read-time display key that keeps pending above completed.
//!
//! # Invariants
//! - Completion state, not drag position, decides an entry's partition.
//! - Every reassignment numbers the whole bucket `1..=N`, pending first.
//! - Ties keep input order (all sorts are stable).
//! - Nothing here fails: unknown ids yield an empty reassignment and target
//!   positions are clamped.

use crate::model::habit::{Habit, HabitId};
use crate::model::item::{Item, ItemId};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Offset added to completed entries when computing display order.
pub const COMPLETED_ORDER_OFFSET: i64 = 1_000_000;

/// Read-only view of an orderable entry.
pub trait Ordered {
    type Id: Copy + Ord + Debug;

    fn order_id(&self) -> Self::Id;
    fn order_index(&self) -> i64;
    fn is_completed(&self) -> bool;
}

/// Stored record whose `order_index` can be rewritten.
pub trait Positioned {
    type Id: Copy + Ord + Debug;

    fn position_id(&self) -> Self::Id;
    fn set_order_index(&mut self, order_index: i64);
}

impl<T: Ordered> Ordered for &T {
    type Id = T::Id;

    fn order_id(&self) -> Self::Id {
        (**self).order_id()
    }

    fn order_index(&self) -> i64 {
        (**self).order_index()
    }

    fn is_completed(&self) -> bool {
        (**self).is_completed()
    }
}

impl Ordered for Item {
    type Id = ItemId;

    fn order_id(&self) -> ItemId {
        self.id
    }

    fn order_index(&self) -> i64 {
        self.order_index
    }

    fn is_completed(&self) -> bool {
        Item::is_completed(self)
    }
}

impl Positioned for Item {
    type Id = ItemId;

    fn position_id(&self) -> ItemId {
        self.id
    }

    fn set_order_index(&mut self, order_index: i64) {
        self.order_index = order_index;
    }
}

impl Positioned for Habit {
    type Id = HabitId;

    fn position_id(&self) -> HabitId {
        self.id
    }

    fn set_order_index(&mut self, order_index: i64) {
        self.order_index = order_index;
    }
}

/// One habit row for a given day: the habit's global index plus whether it
/// has been checked off that day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitLine {
    pub habit_id: HabitId,
    pub name: String,
    pub order_index: i64,
    pub done: bool,
}

impl Ordered for HabitLine {
    type Id = HabitId;

    fn order_id(&self) -> HabitId {
        self.habit_id
    }

    fn order_index(&self) -> i64 {
        self.order_index
    }

    fn is_completed(&self) -> bool {
        self.done
    }
}

/// New `order_index` values keyed by entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment<Id: Ord> {
    indexes: BTreeMap<Id, i64>,
}

impl<Id: Ord> Default for Reassignment<Id> {
    fn default() -> Self {
        Self {
            indexes: BTreeMap::new(),
        }
    }
}

impl<Id: Copy + Ord> Reassignment<Id> {
    fn numbered(ids: impl IntoIterator<Item = Id>) -> Self {
        let indexes = ids
            .into_iter()
            .enumerate()
            .map(|(position, id)| (id, position as i64 + 1))
            .collect();
        Self { indexes }
    }

    pub fn get(&self, id: Id) -> Option<i64> {
        self.indexes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, i64)> + '_ {
        self.indexes.iter().map(|(id, index)| (*id, *index))
    }

    /// Writes the new indexes into matching stored records.
    ///
    /// Records not named by the reassignment are left untouched.
    pub fn apply<T>(&self, records: &mut [T])
    where
        T: Positioned<Id = Id>,
    {
        for record in records.iter_mut() {
            if let Some(index) = self.get(record.position_id()) {
                record.set_order_index(index);
            }
        }
    }
}

/// Sort key that places completed entries after every pending entry.
pub fn display_key(order_index: i64, completed: bool) -> i64 {
    if completed {
        order_index.saturating_add(COMPLETED_ORDER_OFFSET)
    } else {
        order_index
    }
}

/// Stable sort by display key.
pub fn sort_for_display<T: Ordered>(entries: &mut [T]) {
    entries.sort_by_key(|entry| display_key(entry.order_index(), entry.is_completed()));
}

/// Returns whether every pending index is below every completed index.
pub fn is_partitioned<T: Ordered>(entries: &[T]) -> bool {
    let max_pending = entries
        .iter()
        .filter(|entry| !entry.is_completed())
        .map(|entry| entry.order_index())
        .max();
    let min_done = entries
        .iter()
        .filter(|entry| entry.is_completed())
        .map(|entry| entry.order_index())
        .min();
    match (max_pending, min_done) {
        (Some(pending), Some(done)) => pending < done,
        _ => true,
    }
}

/// Moves one entry to `target_position` inside its own partition.
///
/// `bucket` must be in display order. `target_position` indexes the combined
/// pending + done list and is clamped into the moving entry's partition.
pub fn reorder<T: Ordered>(
    bucket: &[T],
    moving_id: T::Id,
    target_position: usize,
) -> Reassignment<T::Id> {
    let Some(moving) = bucket.iter().find(|entry| entry.order_id() == moving_id) else {
        return Reassignment::default();
    };
    let completed = moving.is_completed();

    let (mut pending, mut done) = split_partitions(bucket.iter().map(|entry| {
        (entry.order_id(), entry.is_completed())
    }));
    pending.retain(|id| *id != moving_id);
    done.retain(|id| *id != moving_id);

    place(&mut pending, &mut done, moving_id, completed, Some(target_position));
    Reassignment::numbered(pending.into_iter().chain(done))
}

/// Flips one entry's completion state and sinks it to the bottom of its new
/// partition.
///
/// The toggled entry takes `max(order_index in new partition) + 1` (or `1`
/// when that partition is empty) before the bucket is renumbered.
pub fn toggle_completion<T: Ordered>(
    bucket: &[T],
    toggled_id: T::Id,
    now_completed: bool,
) -> Reassignment<T::Id> {
    if !bucket.iter().any(|entry| entry.order_id() == toggled_id) {
        return Reassignment::default();
    }

    let sink_index = bucket
        .iter()
        .filter(|entry| entry.order_id() != toggled_id && entry.is_completed() == now_completed)
        .map(|entry| entry.order_index())
        .max()
        .unwrap_or(0)
        + 1;

    let mut slots: Vec<(T::Id, i64)> = bucket
        .iter()
        .map(|entry| {
            if entry.order_id() == toggled_id {
                (toggled_id, display_key(sink_index, now_completed))
            } else {
                (
                    entry.order_id(),
                    display_key(entry.order_index(), entry.is_completed()),
                )
            }
        })
        .collect();
    slots.sort_by_key(|(_, key)| *key);
    Reassignment::numbered(slots.into_iter().map(|(id, _)| id))
}

/// Renumbers a bucket `1..=N` in display order.
pub fn normalize<T: Ordered>(bucket: &[T]) -> Reassignment<T::Id> {
    let mut slots: Vec<(T::Id, i64)> = bucket
        .iter()
        .map(|entry| {
            (
                entry.order_id(),
                display_key(entry.order_index(), entry.is_completed()),
            )
        })
        .collect();
    slots.sort_by_key(|(_, key)| *key);
    Reassignment::numbered(slots.into_iter().map(|(id, _)| id))
}

/// Renumbers the entries left behind when `removed_id` leaves the bucket.
pub fn remove_from_bucket<T: Ordered>(bucket: &[T], removed_id: T::Id) -> Reassignment<T::Id> {
    let remaining: Vec<&T> = bucket
        .iter()
        .filter(|entry| entry.order_id() != removed_id)
        .collect();
    normalize(&remaining)
}

/// Inserts `incoming` into `bucket` and renumbers.
///
/// Without a target the entry lands at the end of its partition; with one the
/// same clamping as [`reorder`] applies.
pub fn insert_into_bucket<T: Ordered>(
    bucket: &[T],
    incoming_id: T::Id,
    incoming_completed: bool,
    target_position: Option<usize>,
) -> Reassignment<T::Id> {
    let mut slots: Vec<(T::Id, bool, i64)> = bucket
        .iter()
        .filter(|entry| entry.order_id() != incoming_id)
        .map(|entry| {
            (
                entry.order_id(),
                entry.is_completed(),
                display_key(entry.order_index(), entry.is_completed()),
            )
        })
        .collect();
    slots.sort_by_key(|(_, _, key)| *key);

    let (mut pending, mut done) =
        split_partitions(slots.into_iter().map(|(id, completed, _)| (id, completed)));
    place(
        &mut pending,
        &mut done,
        incoming_id,
        incoming_completed,
        target_position,
    );
    Reassignment::numbered(pending.into_iter().chain(done))
}

fn split_partitions<Id>(entries: impl Iterator<Item = (Id, bool)>) -> (Vec<Id>, Vec<Id>) {
    let mut pending = Vec::new();
    let mut done = Vec::new();
    for (id, completed) in entries {
        if completed {
            done.push(id);
        } else {
            pending.push(id);
        }
    }
    (pending, done)
}

fn place<Id>(
    pending: &mut Vec<Id>,
    done: &mut Vec<Id>,
    id: Id,
    completed: bool,
    target_position: Option<usize>,
) {
    if completed {
        let position = target_position
            .map(|target| target.saturating_sub(pending.len()))
            .unwrap_or(done.len())
            .min(done.len());
        done.insert(position, id);
    } else {
        let position = target_position
            .unwrap_or(pending.len())
            .min(pending.len());
        pending.insert(position, id);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        display_key, insert_into_bucket, is_partitioned, normalize, remove_from_bucket, reorder,
        sort_for_display, toggle_completion, Ordered, COMPLETED_ORDER_OFFSET,
    };
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry {
        id: u32,
        index: i64,
        done: bool,
    }

    impl Ordered for Entry {
        type Id = u32;

        fn order_id(&self) -> u32 {
            self.id
        }

        fn order_index(&self) -> i64 {
            self.index
        }

        fn is_completed(&self) -> bool {
            self.done
        }
    }

    fn entry(id: u32, index: i64, done: bool) -> Entry {
        Entry { id, index, done }
    }

    fn order_of(bucket: &[Entry], reassignment: &super::Reassignment<u32>) -> Vec<u32> {
        let mut next: Vec<Entry> = bucket
            .iter()
            .map(|e| Entry {
                index: reassignment.get(e.id).unwrap_or(e.index),
                ..e.clone()
            })
            .collect();
        next.sort_by_key(|e| e.index);
        next.into_iter().map(|e| e.id).collect()
    }

    #[test]
    fn display_key_offsets_completed_entries() {
        assert_eq!(display_key(3, false), 3);
        assert_eq!(display_key(3, true), 3 + COMPLETED_ORDER_OFFSET);
    }

    #[test]
    fn display_key_saturates_on_huge_indexes() {
        assert_eq!(display_key(i64::MAX - 1, true), i64::MAX);
        assert_eq!(display_key(i64::MAX, false), i64::MAX);
    }

    #[test]
    fn reorder_moves_within_pending_partition() {
        let bucket = vec![entry(1, 1, false), entry(2, 2, false), entry(3, 3, false)];
        let reassignment = reorder(&bucket, 3, 0);
        assert_eq!(order_of(&bucket, &reassignment), vec![3, 1, 2]);
        assert_eq!(reassignment.get(3), Some(1));
    }

    #[test]
    fn pending_entry_dragged_into_done_list_is_clamped() {
        let bucket = vec![entry(1, 1, false), entry(2, 2, false), entry(3, 3, true)];
        let reassignment = reorder(&bucket, 1, 10);
        assert_eq!(order_of(&bucket, &reassignment), vec![2, 1, 3]);
    }

    #[test]
    fn done_entry_dragged_above_pending_is_clamped() {
        let bucket = vec![
            entry(1, 1, false),
            entry(2, 2, true),
            entry(3, 3, true),
        ];
        let reassignment = reorder(&bucket, 3, 0);
        assert_eq!(order_of(&bucket, &reassignment), vec![1, 3, 2]);
    }

    #[test]
    fn reorder_unknown_id_is_a_no_op() {
        let bucket = vec![entry(1, 1, false)];
        assert!(reorder(&bucket, 9, 0).is_empty());
        assert!(toggle_completion(&bucket, 9, true).is_empty());
    }

    #[test]
    fn completing_sinks_to_bottom_of_done() {
        let bucket = vec![
            entry(1, 1, false),
            entry(2, 2, false),
            entry(3, 3, true),
        ];
        let reassignment = toggle_completion(&bucket, 1, true);
        assert_eq!(order_of(&bucket, &reassignment), vec![2, 3, 1]);
        assert_eq!(reassignment.get(1), Some(3));
    }

    #[test]
    fn reopening_sinks_to_bottom_of_pending() {
        let bucket = vec![
            entry(1, 1, false),
            entry(2, 2, false),
            entry(3, 3, true),
            entry(4, 4, true),
        ];
        let reassignment = toggle_completion(&bucket, 3, false);
        assert_eq!(order_of(&bucket, &reassignment), vec![1, 2, 3, 4]);
        assert_eq!(reassignment.get(3), Some(3));

        let reassignment = toggle_completion(&bucket, 4, false);
        assert_eq!(order_of(&bucket, &reassignment), vec![1, 2, 4, 3]);
    }

    #[test]
    fn remove_and_insert_renumber_contiguously() {
        let bucket = vec![entry(1, 1, false), entry(2, 2, false), entry(3, 3, true)];
        let removed = remove_from_bucket(&bucket, 2);
        assert_eq!(removed.get(1), Some(1));
        assert_eq!(removed.get(3), Some(2));
        assert_eq!(removed.get(2), None);

        let appended = insert_into_bucket(&bucket, 7, false, None);
        assert_eq!(appended.get(7), Some(3));
        assert_eq!(appended.get(3), Some(4));

        let targeted = insert_into_bucket(&bucket, 7, true, Some(0));
        assert_eq!(targeted.get(7), Some(3));
        assert_eq!(targeted.get(3), Some(4));
    }

    #[test]
    fn normalize_keeps_ties_in_input_order() {
        let bucket = vec![entry(5, 1, false), entry(4, 1, false), entry(3, 0, true)];
        let reassignment = normalize(&bucket);
        assert_eq!(reassignment.get(5), Some(1));
        assert_eq!(reassignment.get(4), Some(2));
        assert_eq!(reassignment.get(3), Some(3));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reorder { slot: usize, target: usize },
        Toggle { slot: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, 0usize..10).prop_map(|(slot, target)| Op::Reorder { slot, target }),
            (0usize..8).prop_map(|slot| Op::Toggle { slot }),
        ]
    }

    proptest! {
        #[test]
        fn partition_invariant_survives_any_sequence(
            initial in prop::collection::vec((-5i64..20, any::<bool>()), 1..8),
            ops in prop::collection::vec(op_strategy(), 1..24),
        ) {
            let mut bucket: Vec<Entry> = initial
                .into_iter()
                .enumerate()
                .map(|(id, (index, done))| entry(id as u32, index, done))
                .collect();

            for op in ops {
                sort_for_display(&mut bucket);
                let reassignment = match op {
                    Op::Reorder { slot, target } => {
                        let id = bucket[slot % bucket.len()].id;
                        reorder(&bucket, id, target)
                    }
                    Op::Toggle { slot } => {
                        let position = slot % bucket.len();
                        let id = bucket[position].id;
                        let now_done = !bucket[position].done;
                        let reassignment = toggle_completion(&bucket, id, now_done);
                        bucket[position].done = now_done;
                        reassignment
                    }
                };
                for e in bucket.iter_mut() {
                    if let Some(index) = reassignment.get(e.id) {
                        e.index = index;
                    }
                }
                prop_assert!(is_partitioned(&bucket));
                let mut indexes: Vec<i64> = bucket.iter().map(|e| e.index).collect();
                indexes.sort_unstable();
                prop_assert_eq!(indexes, (1..=bucket.len() as i64).collect::<Vec<_>>());
            }
        }
    }
}
