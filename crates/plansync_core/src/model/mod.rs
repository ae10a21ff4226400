//! Planning domain model.
//!
//! # Responsibility
//! - Define canonical data structures held by the snapshot store.
//! - Keep serialized shapes flat so the same form feeds cache and remote rows.
//!
//! # Invariants
//! - Every record is identified by a writer-assigned `Uuid`.
//! - Append-only records (reflections, scores, messages) are never edited.

pub mod habit;
pub mod item;
pub mod journal;
pub mod snapshot;
