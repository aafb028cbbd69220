//! Slot schema
//!
//! The declarative table of logical slots a tent can have. Each slot lists
//! the entity domains and device classes it accepts, whether it can hold
//! more than one entity, and whether a complete tent needs it.

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tent_config::Category;
use tent_core::domains::{BINARY_SENSOR, CAMERA, CLIMATE, FAN, HUMIDIFIER, LIGHT, SENSOR, SWITCH};
use tent_core::Entity;
use thiserror::Error;

/// Schema validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("slot '{category}.{key}' accepts no domains")]
    NoDomains { category: Category, key: String },

    #[error("slot '{category}.{key}' is declared twice")]
    DuplicateSlot { category: Category, key: String },
}

/// One logical slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub category: Category,
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    pub domains: Vec<String>,
    /// Accepted device classes. `None` is the wildcard marker; an empty list
    /// accepts any device class too.
    #[serde(default)]
    pub device_classes: Vec<Option<String>>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub required: bool,
}

impl SlotDefinition {
    pub fn new(category: Category, key: &str, label: &str, icon: &str, domains: &[&str]) -> Self {
        Self {
            category,
            key: key.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            device_classes: Vec::new(),
            multiple: false,
            required: false,
        }
    }

    pub fn device_classes(mut self, classes: &[Option<&str>]) -> Self {
        self.device_classes = classes.iter().map(|c| c.map(str::to_string)).collect();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Does the slot accept this domain / device class pair?
    pub fn accepts_parts(&self, domain: &str, device_class: Option<&str>) -> bool {
        if !self.domains.iter().any(|d| d == domain) {
            return false;
        }
        self.device_classes.is_empty()
            || self.device_classes.iter().any(|c| match c {
                None => true,
                Some(c) => Some(c.as_str()) == device_class,
            })
    }

    pub fn accepts(&self, entity: &Entity) -> bool {
        self.accepts_parts(entity.domain(), entity.device_class.as_deref())
    }
}

/// The full slot table, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSchema {
    slots: Vec<SlotDefinition>,
}

impl SlotSchema {
    /// Build and validate a schema
    pub fn new(slots: Vec<SlotDefinition>) -> Result<Self, SchemaError> {
        let schema = Self { slots };
        schema.validate()?;
        Ok(schema)
    }

    /// The schema every tent uses, validated on first access
    ///
    /// # Panics
    ///
    /// If the built-in table itself is malformed.
    pub fn builtin() -> &'static SlotSchema {
        static SCHEMA: OnceLock<SlotSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| match Self::new(builtin_slots()) {
            Ok(schema) => schema,
            Err(e) => panic!("built-in slot schema is invalid: {}", e),
        })
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.domains.is_empty() {
                return Err(SchemaError::NoDomains {
                    category: slot.category,
                    key: slot.key.clone(),
                });
            }
            if self.slots[..i]
                .iter()
                .any(|s| s.category == slot.category && s.key == slot.key)
            {
                return Err(SchemaError::DuplicateSlot {
                    category: slot.category,
                    key: slot.key.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.iter()
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.iter().filter(move |s| s.category == category)
    }

    pub fn get(&self, category: Category, key: &str) -> Option<&SlotDefinition> {
        self.in_category(category).find(|s| s.key == key)
    }

    /// Whether a slot holds a list; unknown slots are treated as single
    pub fn is_multiple(&self, category: Category, key: &str) -> bool {
        self.get(category, key).map(|s| s.multiple).unwrap_or(false)
    }

    pub fn required(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.iter().filter(|s| s.required)
    }

    /// `{"sensors": {key: def}, "actuators": {key: def}}` for clients
    pub fn by_category(&self) -> IndexMap<Category, IndexMap<&str, &SlotDefinition>> {
        let mut out: IndexMap<Category, IndexMap<&str, &SlotDefinition>> = IndexMap::new();
        for category in Category::ALL {
            out.insert(
                category,
                self.in_category(category)
                    .map(|s| (s.key.as_str(), s))
                    .collect(),
            );
        }
        out
    }
}

fn builtin_slots() -> Vec<SlotDefinition> {
    use Category::{Actuators as A, Sensors as S};

    vec![
        SlotDefinition::new(S, "temperature", "Temperature", "🌡️", &[SENSOR])
            .device_classes(&[Some("temperature")])
            .multiple()
            .required(),
        SlotDefinition::new(S, "humidity", "Humidity", "💧", &[SENSOR])
            .device_classes(&[Some("humidity")])
            .multiple()
            .required(),
        SlotDefinition::new(S, "co2", "CO2 Sensor", "🫧", &[SENSOR])
            .device_classes(&[Some("carbon_dioxide")]),
        SlotDefinition::new(S, "light_level", "Light Sensor", "☀️", &[SENSOR])
            .device_classes(&[Some("illuminance")]),
        SlotDefinition::new(S, "reservoir_level", "Reservoir Level", "🪣", &[SENSOR])
            .device_classes(&[Some("volume"), Some("distance"), None]),
        SlotDefinition::new(S, "leak_sensor", "Leak Sensor", "🚨", &[BINARY_SENSOR])
            .device_classes(&[Some("moisture"), Some("water")]),
        SlotDefinition::new(S, "power_usage", "Power Monitor", "⚡", &[SENSOR])
            .device_classes(&[Some("power"), Some("energy")]),
        SlotDefinition::new(S, "camera", "Camera", "📷", &[CAMERA])
            .device_classes(&[None])
            .multiple(),
        SlotDefinition::new(A, "light", "Grow Lights", "💡", &[SWITCH, LIGHT])
            .device_classes(&[None])
            .multiple(),
        SlotDefinition::new(A, "exhaust_fan", "Exhaust Fans", "🌀", &[FAN, SWITCH])
            .device_classes(&[None])
            .multiple(),
        SlotDefinition::new(A, "circulation_fan", "Circulation Fans", "🔄", &[FAN, SWITCH])
            .device_classes(&[None])
            .multiple(),
        SlotDefinition::new(A, "humidifier", "Humidifier", "💨", &[SWITCH, HUMIDIFIER])
            .device_classes(&[None]),
        SlotDefinition::new(A, "dehumidifier", "Dehumidifier", "🏜️", &[SWITCH])
            .device_classes(&[None]),
        SlotDefinition::new(A, "heater", "Heater", "🔥", &[SWITCH, CLIMATE])
            .device_classes(&[None]),
        SlotDefinition::new(A, "ac", "A/C", "❄️", &[SWITCH, CLIMATE]).device_classes(&[None]),
        SlotDefinition::new(A, "water_pump", "Water Pumps", "🚿", &[SWITCH])
            .device_classes(&[None])
            .multiple(),
        SlotDefinition::new(A, "drain_pump", "Drain Pump", "🔽", &[SWITCH])
            .device_classes(&[None]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let schema = SlotSchema::builtin();
        schema.validate().unwrap();
        assert_eq!(schema.in_category(Category::Sensors).count(), 8);
        assert_eq!(schema.in_category(Category::Actuators).count(), 9);
        assert!(schema.is_multiple(Category::Actuators, "exhaust_fan"));
        assert!(!schema.is_multiple(Category::Actuators, "heater"));
        assert!(!schema.is_multiple(Category::Actuators, "no_such_slot"));
    }

    #[test]
    fn test_builtin_goes_through_validation() {
        assert_eq!(
            SlotSchema::new(builtin_slots()).unwrap(),
            *SlotSchema::builtin()
        );
    }

    #[test]
    fn test_required_slots() {
        let keys: Vec<_> = SlotSchema::builtin()
            .required()
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(keys, vec!["temperature", "humidity"]);
    }

    #[test]
    fn test_rejects_empty_domains() {
        let err = SlotSchema::new(vec![SlotDefinition::new(
            Category::Sensors,
            "ghost",
            "Ghost",
            "",
            &[],
        )])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::NoDomains {
                category: Category::Sensors,
                key: "ghost".into()
            }
        );
    }

    #[test]
    fn test_rejects_duplicates_within_category_only() {
        let dup = SlotSchema::new(vec![
            SlotDefinition::new(Category::Sensors, "x", "X", "", &["sensor"]),
            SlotDefinition::new(Category::Sensors, "x", "X", "", &["sensor"]),
        ]);
        assert!(matches!(dup, Err(SchemaError::DuplicateSlot { .. })));

        let ok = SlotSchema::new(vec![
            SlotDefinition::new(Category::Sensors, "x", "X", "", &["sensor"]),
            SlotDefinition::new(Category::Actuators, "x", "X", "", &["switch"]),
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_device_class_rules() {
        let schema = SlotSchema::builtin();
        let reservoir = schema.get(Category::Sensors, "reservoir_level").unwrap();
        assert!(reservoir.accepts_parts("sensor", Some("volume")));
        assert!(reservoir.accepts_parts("sensor", Some("battery")));
        assert!(reservoir.accepts_parts("sensor", None));
        assert!(!reservoir.accepts_parts("switch", None));

        let temperature = schema.get(Category::Sensors, "temperature").unwrap();
        assert!(temperature.accepts_parts("sensor", Some("temperature")));
        assert!(!temperature.accepts_parts("sensor", None));
        assert!(!temperature.accepts_parts("sensor", Some("humidity")));
    }

    #[test]
    fn test_by_category_shape() {
        let json = serde_json::to_value(SlotSchema::builtin().by_category()).unwrap();
        assert_eq!(json["sensors"]["temperature"]["label"], "Temperature");
        assert_eq!(json["actuators"]["exhaust_fan"]["multiple"], true);
    }
}
