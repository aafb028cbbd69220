//! Push messages on the live channel

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::TentLiveState;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One active alert of a tent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// `temp_out_of_range`, `humidity_out_of_range`, `leak_detected`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
}

impl Alert {
    pub fn new(kind: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            message: message.into(),
        }
    }
}

/// Dashboard-wide alert counters, merged field by field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertSummary(Map<String, Value>);

impl AlertSummary {
    /// Overwrite every field present in `delta`; nested values are replaced
    pub fn merge(&mut self, delta: Map<String, Value>) {
        for (key, value) in delta {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Message received on the live channel, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Full snapshot of every tent
    InitialState { tents: Vec<TentLiveState> },
    /// Replacement live state of one tent
    TentUpdate {
        tent_id: String,
        data: TentLiveState,
    },
    /// Reply to a `get_tent` request, applied like an update
    TentState {
        tent_id: String,
        data: TentLiveState,
    },
    /// Alert-summary delta
    Alert {
        #[serde(default)]
        data: Map<String, Value>,
    },
    Pong,
    #[serde(other)]
    Unknown,
}

/// Message sent to the live channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    GetTent { tent_id: String },
}
