//! Core use-case services.
//!
//! # Responsibility
//! - Turn user intents into validated snapshot mutations.
//! - Keep views decoupled from ordering, recurrence and sync details.

pub mod planner_service;

pub use planner_service::{ItemDraft, ItemPatch, PlannerError, PlannerResult, PlannerService};
