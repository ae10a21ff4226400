//! Pure scheduling helpers: recurrence expansion and manual ordering.
//!
//! Nothing in this module touches the store, the clock or the network.

pub mod order;
pub mod recurrence;
