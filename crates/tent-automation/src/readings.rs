//! Live readings consumed by chain derivation

use std::collections::HashMap;

/// Live-state field holding the current value of a sensor type
///
/// Multi-entity slots are read through their averages.
pub fn live_field(sensor_type: &str) -> &str {
    match sensor_type {
        "temperature" => "avg_temperature",
        "humidity" => "avg_humidity",
        other => other,
    }
}

/// Read access to one tent's live state
pub trait LiveReadings {
    /// Numeric value of a live-state field (`avg_temperature`, `vpd`, ...)
    fn value(&self, field: &str) -> Option<f64>;

    /// Current state of an actuator slot
    fn actuator_state(&self, slot: &str) -> Option<&str>;

    /// Raw state string of a sensor slot (binary sensors)
    fn sensor_state(&self, slot: &str) -> Option<&str>;
}

/// No live state received yet
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReadings;

impl LiveReadings for NoReadings {
    fn value(&self, _field: &str) -> Option<f64> {
        None
    }

    fn actuator_state(&self, _slot: &str) -> Option<&str> {
        None
    }

    fn sensor_state(&self, _slot: &str) -> Option<&str> {
        None
    }
}

/// Plain map-backed readings
#[derive(Debug, Clone, Default)]
pub struct Readings {
    pub values: HashMap<String, f64>,
    pub actuators: HashMap<String, String>,
    pub sensors: HashMap<String, String>,
}

impl Readings {
    pub fn with_value(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn with_actuator(mut self, slot: &str, state: &str) -> Self {
        self.actuators.insert(slot.to_string(), state.to_string());
        self
    }

    pub fn with_sensor_state(mut self, slot: &str, state: &str) -> Self {
        self.sensors.insert(slot.to_string(), state.to_string());
        self
    }
}

impl LiveReadings for Readings {
    fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    fn actuator_state(&self, slot: &str) -> Option<&str> {
        self.actuators.get(slot).map(String::as_str)
    }

    fn sensor_state(&self, slot: &str) -> Option<&str> {
        self.sensors.get(slot).map(String::as_str)
    }
}

/// Current value of a chain's sensor
pub fn sensor_value(readings: &dyn LiveReadings, sensor_type: &str) -> Option<f64> {
    readings.value(live_field(sensor_type))
}
