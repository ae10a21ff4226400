//! Local persistence behind the snapshot store.
//!
//! # Responsibility
//! - Define the durable cache contract used by hydration and write-back.
//! - Keep SQLite details out of the store and service layers.
//!
//! # Invariants
//! - The cache holds at most one snapshot blob per namespace.

pub mod snapshot_cache;
