//! Live-state errors

use thiserror::Error;

/// Errors raised by the live channel and the action sink
#[derive(Debug, Error)]
pub enum LiveError {
    /// The command sink rejected or failed an action; the pending flag has
    /// already been cleared when this is returned
    #[error("Action on {tent_id}/{slot} failed: {reason}")]
    ActionFailed {
        tent_id: String,
        slot: String,
        reason: String,
    },

    #[error("Unknown tent: {0}")]
    UnknownTent(String),

    #[error("Live channel error: {0}")]
    Channel(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for live-state operations
pub type LiveResult<T> = Result<T, LiveError>;
