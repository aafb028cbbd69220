//! Slots and compatibility
//!
//! - [`SlotSchema`] - the declarative table of sensor and actuator slots
//! - [`compatible_slots`] - which slots an entity may occupy
//! - [`guess_tent`] - the default tent for quick-add
//! - [`validate_tent`] - errors and warnings for a tent configuration

mod guess;
mod matcher;
mod schema;
mod validate;

pub use guess::{guess_tent, tent_score, tent_scores, tokens};
pub use matcher::{
    assignable_entities, compatible_slots, is_compatible, suggest_slot, unplaced_entities,
    SlotMatch,
};
pub use schema::{SchemaError, SlotDefinition, SlotSchema};
pub use validate::{validate_tent, ValidationReport};
