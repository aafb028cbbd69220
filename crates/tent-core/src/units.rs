//! Temperature display units
//!
//! Thresholds and readings are stored in Celsius. Conversion to a preferred
//! display unit happens only when rendering.

use serde::{Deserialize, Serialize};

/// Preferred temperature display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Convert a value in this unit back to Celsius
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fahrenheit_conversion() {
        let f = TemperatureUnit::Fahrenheit;
        assert_eq!(f.from_celsius(100.0), 212.0);
        assert_eq!(f.from_celsius(0.0), 32.0);
        assert!((f.to_celsius(82.4) - 28.0).abs() < 1e-9);
        assert_eq!(f.symbol(), "°F");
    }

    #[test]
    fn test_celsius_is_identity() {
        let c = TemperatureUnit::Celsius;
        assert_eq!(c.from_celsius(28.0), 28.0);
        assert_eq!(c.to_celsius(28.0), 28.0);
    }
}
