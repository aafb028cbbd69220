//! Automation errors

use thiserror::Error;

/// Automation errors
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Automation not found: {0}")]
    NotFound(String),

    #[error("Unknown chain template: {0}")]
    UnknownTemplate(String),

    #[error("Chain {0} has no editable threshold")]
    NoThreshold(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid automation configuration: {0}")]
    InvalidConfig(String),

    #[error("Automation registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;
