//! Live tent state
//!
//! The frequently updated companion of a tent's configuration. Only ever
//! held in memory; a `tent_update` replaces the whole value for that tent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tent_automation::LiveReadings;

use crate::message::Alert;

/// Latest value of one sensor slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Number, numeric string, or a raw state such as `"on"`
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl SensorReading {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            unit: None,
            updated: None,
        }
    }

    /// Numeric value, parsing numeric strings
    pub fn number(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Raw state string
    pub fn text(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Latest state of one actuator slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorReading {
    pub state: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl ActuatorReading {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: serde_json::Map::new(),
            updated: None,
        }
    }
}

/// Live state of one tent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TentLiveState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorReading>,
    #[serde(default)]
    pub actuators: BTreeMap<String, ActuatorReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_humidity: Option<f64>,
    #[serde(default)]
    pub vpd: Option<f64>,
    #[serde(default)]
    pub environment_score: u8,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Fields this crate does not interpret (targets, schedules, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TentLiveState {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sensor(mut self, slot: &str, value: impl Into<Value>) -> Self {
        self.sensors.insert(slot.to_string(), SensorReading::new(value));
        self
    }

    pub fn with_actuator(mut self, slot: &str, state: &str) -> Self {
        self.actuators
            .insert(slot.to_string(), ActuatorReading::new(state));
        self
    }

    pub fn temperature(&self) -> Option<f64> {
        self.avg_temperature
            .or_else(|| self.sensors.get("temperature").and_then(SensorReading::number))
    }

    pub fn humidity(&self) -> Option<f64> {
        self.avg_humidity
            .or_else(|| self.sensors.get("humidity").and_then(SensorReading::number))
    }
}

impl LiveReadings for TentLiveState {
    fn value(&self, field: &str) -> Option<f64> {
        match field {
            "avg_temperature" => self.temperature(),
            "avg_humidity" => self.humidity(),
            "vpd" => self.vpd,
            slot => self.sensors.get(slot).and_then(SensorReading::number),
        }
    }

    fn actuator_state(&self, slot: &str) -> Option<&str> {
        self.actuators.get(slot).map(|a| a.state.as_str())
    }

    fn sensor_state(&self, slot: &str) -> Option<&str> {
        self.sensors.get(slot).and_then(SensorReading::text)
    }
}
