//! Time-bounded undo for soft-deleted items.
//!
//! # Invariants
//! - An entry can be restored at most once.
//! - An entry older than the window is never restored; asking for it reports
//!   expiry and drops it.

use crate::model::item::Item;
use chrono::Utc;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Default time an undo stays available.
pub const UNDO_WINDOW_MS: i64 = 7_000;

pub type DeletionId = Uuid;

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoError {
    /// The window closed before undo was requested.
    Expired(DeletionId),
    /// No pending deletion with this id (already undone, swept or never made).
    Unknown(DeletionId),
}

impl Display for UndoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired(id) => write!(f, "undo window expired for deletion {id}"),
            Self::Unknown(id) => write!(f, "no pending deletion {id}"),
        }
    }
}

impl Error for UndoError {}

#[derive(Debug, Clone)]
struct PendingDeletion {
    id: DeletionId,
    items: Vec<Item>,
    deleted_at_ms: i64,
}

/// Pending deletions, oldest first.
#[derive(Debug, Clone)]
pub struct UndoBuffer {
    window_ms: i64,
    entries: Vec<PendingDeletion>,
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(UNDO_WINDOW_MS)
    }
}

impl UndoBuffer {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms: window_ms.max(0),
            entries: Vec::new(),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &PendingDeletion, now_ms: i64) -> bool {
        now_ms - entry.deleted_at_ms >= self.window_ms
    }

    /// Records removed items and returns the handle used to undo them.
    pub fn push(&mut self, items: Vec<Item>, now_ms: i64) -> DeletionId {
        self.sweep(now_ms);
        let id = Uuid::new_v4();
        self.entries.push(PendingDeletion {
            id,
            items,
            deleted_at_ms: now_ms,
        });
        id
    }

    /// Removes and returns the items of `id` if its window is still open.
    pub fn take(&mut self, id: DeletionId, now_ms: i64) -> Result<Vec<Item>, UndoError> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(UndoError::Unknown(id))?;
        let entry = self.entries.remove(position);
        self.sweep(now_ms);
        if self.is_expired(&entry, now_ms) {
            return Err(UndoError::Expired(id));
        }
        Ok(entry.items)
    }

    /// Drops every expired entry; returns how many were dropped.
    pub fn sweep(&mut self, now_ms: i64) -> usize {
        let before = self.entries.len();
        let window_ms = self.window_ms;
        self.entries
            .retain(|entry| now_ms - entry.deleted_at_ms < window_ms);
        before - self.entries.len()
    }
}
