//! Local-first planner state engine.
//!
//! One owned snapshot per account, mutated synchronously through
//! [`SnapshotStore`], cached locally and reconciled with a remote store in
//! the background.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{AccountContext, ConfigError, EngineConfig};
pub use engine::{EngineError, PlannerEngine};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::habit::{Habit, HabitCadence, HabitId, HabitLog};
pub use model::item::{Bucket, Cadence, Item, ItemId, ItemStatus, Priority};
pub use model::journal::{ChatMessage, ChatRole, Goal, GoalId, LifeArea, Reflection};
pub use model::snapshot::Snapshot;
pub use repo::snapshot_cache::{MemorySnapshotCache, SnapshotCache, SqliteSnapshotCache};
pub use schedule::order::HabitLine;
pub use schedule::recurrence::{expand, RecurrenceError};
pub use service::{ItemDraft, ItemPatch, PlannerError, PlannerResult, PlannerService};
pub use store::undo::{Clock, DeletionId, ManualClock, SystemClock, UndoError};
pub use store::{HydrationSource, SnapshotStore};
pub use sync::{
    reconcile, InMemoryRemoteStore, RemoteStore, RemoteTable, SyncHandle, SyncJob, SyncStats,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
