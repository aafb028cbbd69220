//! Assignment store errors

use tent_config::Category;
use thiserror::Error;

/// Errors from assignment operations
///
/// None of these leave the store modified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("Tent not found: {0}")]
    TentNotFound(String),

    #[error("Slot {category}.{slot} has no assignment in tent {tent_id}")]
    SlotNotFound {
        tent_id: String,
        category: Category,
        slot: String,
    },

    #[error("Unknown slot {category}.{slot}")]
    UnknownSlot { category: Category, slot: String },

    #[error("Index {index} out of range for {category}.{slot} ({len} assigned)")]
    IndexOutOfRange {
        category: Category,
        slot: String,
        index: usize,
        len: usize,
    },

    #[error("Entity '{entity_id}' cannot be assigned to {category}.{slot}")]
    Incompatible {
        entity_id: String,
        category: Category,
        slot: String,
    },
}

/// Result type for assignment operations
pub type AssignmentResult<T> = Result<T, AssignmentError>;
