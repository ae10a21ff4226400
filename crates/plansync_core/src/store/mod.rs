//! Snapshot store.
//!
//! # Responsibility
//! - Own the canonical snapshot and its single mutation entry point.
//! - Notify observers, write the durable cache and queue sync work after
//!   every mutation.
//! - Hold soft-deleted items for the undo window.
//!
//! # Invariants
//! - `mutate` takes `&mut self`; there is exactly one writer.
//! - Hydration runs at most once per store.
//! - The cache is only written after hydration, so a cold store never
//!   overwrites a good blob with seed content.
//! - Sync is queued, never awaited.

pub mod undo;

use crate::model::item::{Item, ItemId};
use crate::model::snapshot::Snapshot;
use crate::repo::snapshot_cache::{decode_snapshot, encode_snapshot, SnapshotCache};
use crate::sync::remote::RemoteTable;
use crate::sync::worker::{SyncHandle, SyncJob};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use undo::{Clock, DeletionId, SystemClock, UndoBuffer, UndoError};
use uuid::Uuid;

pub type SubscriptionId = u64;

type Observer = Box<dyn Fn(&Snapshot) + Send>;

/// Where the hydrated snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationSource {
    Remote,
    Cache,
    /// Cache absent, unreadable or corrupt.
    Seeded,
}

impl HydrationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Cache => "cache",
            Self::Seeded => "seeded",
        }
    }
}

pub struct SnapshotStore {
    current: Arc<Snapshot>,
    hydrated_from: Option<HydrationSource>,
    cache: Box<dyn SnapshotCache>,
    sync: Option<SyncHandle>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
    undo: UndoBuffer,
    clock: Arc<dyn Clock>,
}

impl SnapshotStore {
    /// Creates a cold store; call [`SnapshotStore::hydrate`] before use.
    pub fn new(cache: Box<dyn SnapshotCache>) -> Self {
        Self {
            current: Arc::new(Snapshot::seeded()),
            hydrated_from: None,
            cache,
            sync: None,
            observers: Vec::new(),
            next_subscription: 1,
            undo: UndoBuffer::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_undo_window_ms(mut self, window_ms: i64) -> Self {
        self.undo = UndoBuffer::new(window_ms);
        self
    }

    /// Starts queueing a reconcile job after every mutation.
    pub fn attach_sync(&mut self, handle: SyncHandle) {
        self.sync = Some(handle);
    }

    /// Stops queueing sync work; returns the detached handle.
    pub fn detach_sync(&mut self) -> Option<SyncHandle> {
        self.sync.take()
    }

    pub fn is_synced(&self) -> bool {
        self.sync.is_some()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn hydrated_from(&self) -> Option<HydrationSource> {
        self.hydrated_from
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated_from.is_some()
    }

    /// Loads the durable cache once; falls back to the seeded snapshot.
    pub fn hydrate(&mut self) -> HydrationSource {
        if let Some(source) = self.hydrated_from {
            return source;
        }

        let (snapshot, source) = match self.cache.load() {
            Ok(Some(payload)) => match decode_snapshot(&payload) {
                Ok(snapshot) => (snapshot, HydrationSource::Cache),
                Err(err) => {
                    warn!("event=store_hydrate module=store status=fallback reason=decode error={err}");
                    (Snapshot::seeded(), HydrationSource::Seeded)
                }
            },
            Ok(None) => (Snapshot::seeded(), HydrationSource::Seeded),
            Err(err) => {
                warn!("event=store_hydrate module=store status=fallback reason=load error={err}");
                (Snapshot::seeded(), HydrationSource::Seeded)
            }
        };
        self.finish_hydration(snapshot, source);
        source
    }

    /// Hydrates from an already loaded remote snapshot and caches it.
    ///
    /// No-op when the store is already hydrated.
    pub fn hydrate_from_remote(&mut self, snapshot: Snapshot) -> HydrationSource {
        if let Some(source) = self.hydrated_from {
            return source;
        }
        self.finish_hydration(snapshot, HydrationSource::Remote);
        self.persist();
        HydrationSource::Remote
    }

    fn finish_hydration(&mut self, snapshot: Snapshot, source: HydrationSource) {
        self.current = Arc::new(snapshot);
        self.hydrated_from = Some(source);
        info!(
            "event=store_hydrate module=store status=ok source={} items={}",
            source.as_str(),
            self.current.items.len()
        );
        self.notify();
    }

    /// Replaces the snapshot with `transform(current)`.
    ///
    /// Observers see the new value before this returns; the cache write and
    /// sync enqueue follow. Returns the new snapshot.
    pub fn mutate(&mut self, transform: impl FnOnce(&Snapshot) -> Snapshot) -> Arc<Snapshot> {
        let previous = Arc::clone(&self.current);
        let next = Arc::new(transform(&previous));
        self.current = Arc::clone(&next);

        self.notify();
        if self.is_hydrated() {
            self.persist();
        }
        if let Some(sync) = &self.sync {
            sync.submit(SyncJob::Reconcile {
                previous,
                next: Arc::clone(&next),
            });
        }
        next
    }

    fn notify(&self) {
        for (_, observer) in &self.observers {
            observer(&self.current);
        }
    }

    fn persist(&self) {
        let result = encode_snapshot(&self.current).and_then(|payload| self.cache.save(&payload));
        if let Err(err) = result {
            warn!("event=cache_write module=store status=error error={err}");
        }
    }

    pub fn subscribe(&mut self, observer: impl Fn(&Snapshot) + Send + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(subscription, _)| *subscription != id);
        self.observers.len() != before
    }

    /// Removes items immediately and keeps them for undo.
    ///
    /// Remaining items keep their `order_index`. Returns `None` when none of
    /// `ids` exist.
    pub fn remove_items_with_undo(&mut self, ids: &[ItemId]) -> Option<DeletionId> {
        let wanted: HashSet<ItemId> = ids.iter().copied().collect();
        let removed: Vec<Item> = self
            .current
            .items
            .iter()
            .filter(|item| wanted.contains(&item.id))
            .cloned()
            .collect();
        if removed.is_empty() {
            return None;
        }

        self.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.items.retain(|item| !wanted.contains(&item.id));
            next
        });
        let count = removed.len();
        let deletion = self.undo.push(removed, self.clock.now_ms());
        info!("event=item_delete module=store status=ok deletion_id={deletion} items={count}");
        Some(deletion)
    }

    /// Reinserts the items of `deletion` with their original bucket and
    /// `order_index`. Returns how many were restored.
    ///
    /// When an item created since the delete took a freed index, that item
    /// and everything after it in the bucket move down one slot.
    pub fn undo_delete(&mut self, deletion: DeletionId) -> Result<usize, UndoError> {
        let items = self.undo.take(deletion, self.clock.now_ms())?;
        let present: HashSet<ItemId> = self.current.items.iter().map(|item| item.id).collect();
        let missing: Vec<Item> = items
            .into_iter()
            .filter(|item| !present.contains(&item.id))
            .collect();
        let count = missing.len();
        if count > 0 {
            let mut restored = missing;
            restored.sort_by_key(|item| item.order_index);
            self.mutate(|snapshot| {
                let mut next = snapshot.clone();
                for item in restored {
                    make_room(&mut next.items, &item);
                    next.items.push(item);
                }
                next
            });
        }
        info!("event=item_undo module=store status=ok deletion_id={deletion} items={count}");
        Ok(count)
    }

    /// Drops expired undo entries.
    pub fn sweep_expired_deletions(&mut self) -> usize {
        let swept = self.undo.sweep(self.clock.now_ms());
        if swept > 0 {
            debug!("event=undo_sweep module=store status=ok swept={swept}");
        }
        swept
    }

    /// Current time from the store clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn pending_deletions(&self) -> usize {
        self.undo.len()
    }

    /// Removes append-only records locally and purges them remotely.
    ///
    /// Diffing never deletes from append-only tables, so this queues an
    /// explicit purge. Returns how many records were removed.
    pub fn purge_append_only(&mut self, table: RemoteTable, ids: &[Uuid]) -> usize {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let snapshot = &self.current;
        let present: Vec<Uuid> = match table {
            RemoteTable::Reflections => snapshot.reflections.iter().map(|r| r.id).collect(),
            RemoteTable::LifeAreaScores => {
                snapshot.life_area_scores.iter().map(|s| s.id).collect()
            }
            RemoteTable::Messages => snapshot.messages.iter().map(|m| m.id).collect(),
            other => {
                warn!("event=purge module=store status=rejected table={other} reason=not_append_only");
                return 0;
            }
        };
        let removed: Vec<Uuid> = present
            .into_iter()
            .filter(|id| wanted.contains(id))
            .collect();
        if removed.is_empty() {
            return 0;
        }

        self.mutate(|snapshot| {
            let mut next = snapshot.clone();
            match table {
                RemoteTable::Reflections => next.reflections.retain(|r| !wanted.contains(&r.id)),
                RemoteTable::LifeAreaScores => {
                    next.life_area_scores.retain(|s| !wanted.contains(&s.id))
                }
                RemoteTable::Messages => next.messages.retain(|m| !wanted.contains(&m.id)),
                _ => {}
            }
            next
        });
        if let Some(sync) = &self.sync {
            sync.submit(SyncJob::Purge {
                table,
                ids: removed.iter().map(Uuid::to_string).collect(),
            });
        }
        removed.len()
    }
}

/// Shifts items at or after `restored`'s slot down by one when the slot is
/// taken, keeping indexes unique within the bucket.
fn make_room(items: &mut [Item], restored: &Item) {
    let bucket = restored.bucket();
    let index = restored.order_index;
    let taken = items
        .iter()
        .any(|item| item.bucket() == bucket && item.order_index == index);
    if !taken {
        return;
    }
    for item in items
        .iter_mut()
        .filter(|item| item.bucket() == bucket && item.order_index >= index)
    {
        item.order_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::undo::{ManualClock, UndoError};
    use super::{HydrationSource, SnapshotStore};
    use crate::model::item::Item;
    use crate::model::snapshot::Snapshot;
    use crate::repo::snapshot_cache::{decode_snapshot, MemorySnapshotCache};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn store_with(cache: &MemorySnapshotCache, clock: &ManualClock) -> SnapshotStore {
        SnapshotStore::new(Box::new(cache.clone())).with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn cold_cache_hydrates_seeded_once_without_writing() {
        let cache = MemorySnapshotCache::new();
        let mut store = store_with(&cache, &ManualClock::new(0));

        assert_eq!(store.hydrate(), HydrationSource::Seeded);
        assert_eq!(*store.snapshot(), Snapshot::seeded());
        assert!(cache.contents().is_none());
        assert_eq!(store.hydrate(), HydrationSource::Seeded);
    }

    #[test]
    fn corrupt_cache_falls_back_to_seeded() {
        let cache = MemorySnapshotCache::with_payload("{\"version\":1,\"snapshot\":42}");
        let mut store = store_with(&cache, &ManualClock::new(0));
        assert_eq!(store.hydrate(), HydrationSource::Seeded);
        assert_eq!(*store.snapshot(), Snapshot::seeded());
    }

    #[test]
    fn mutate_notifies_observers_and_writes_cache_after_hydration() {
        let cache = MemorySnapshotCache::new();
        let mut store = store_with(&cache, &ManualClock::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let subscription = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.mutate(|snapshot| snapshot.clone());
        assert!(cache.contents().is_none());

        store.hydrate();
        let next = store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.items.push(Item::new("Water plants"));
            next
        });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let cached = decode_snapshot(&cache.contents().unwrap()).unwrap();
        assert_eq!(cached, *next);

        assert!(store.unsubscribe(subscription));
        assert!(!store.unsubscribe(subscription));
        store.mutate(|snapshot| snapshot.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn undo_restores_items_inside_window_only() {
        let cache = MemorySnapshotCache::new();
        let clock = ManualClock::new(0);
        let mut store = store_with(&cache, &clock);
        store.hydrate();
        let original = store.snapshot().items[1].clone();

        let deletion = store.remove_items_with_undo(&[original.id]).unwrap();
        assert!(store.snapshot().item(original.id).is_none());
        clock.advance(6_999);
        assert_eq!(store.undo_delete(deletion), Ok(1));
        assert_eq!(store.snapshot().item(original.id), Some(&original));

        let deletion = store.remove_items_with_undo(&[original.id]).unwrap();
        clock.advance(7_000);
        assert_eq!(store.undo_delete(deletion), Err(UndoError::Expired(deletion)));
        assert!(store.snapshot().item(original.id).is_none());
        assert!(store.remove_items_with_undo(&[original.id]).is_none());
    }
}
