//! Remote synchronization.
//!
//! # Responsibility
//! - Diff consecutive snapshots into per-table remote changes.
//! - Push changes from a background worker without blocking mutations.
//! - Rebuild a snapshot from remote rows at startup.
//!
//! # Invariants
//! - Local state is authoritative; remote failures never roll it back.

pub mod hydrate;
pub mod reconcile;
pub mod remote;
pub mod rows;
pub mod worker;

pub use hydrate::load_remote_snapshot;
pub use reconcile::{reconcile, ReconcilePlan, TableChanges};
pub use remote::{
    InMemoryRemoteStore, RemoteError, RemoteResult, RemoteRow, RemoteStore, RemoteTable,
};
pub use worker::{spawn_sync_worker, SyncHandle, SyncJob, SyncStats, SyncWorker};
