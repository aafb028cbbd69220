//! Entity-to-slot assignments
//!
//! [`AssignmentStore`] owns the dashboard's [`tent_config::AppConfig`] and is
//! the only place slot maps are edited. It keeps the invariants the rest of
//! the workspace relies on:
//!
//! - a single-valued slot holds at most one entity
//! - a multi-valued slot holds an ordered list without repeats
//! - an entity occupies at most one slot per tent
//! - a slot with no entities is absent from the map

mod error;
mod store;

pub use error::{AssignmentError, AssignmentResult};
pub use store::{effective_order, AssignmentStore, Placement};
