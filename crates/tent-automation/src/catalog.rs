//! Chain catalog
//!
//! Static table of sensor → threshold → actuator chains. The derivation
//! engine in [`crate::chain`] interprets this table; adding a chain means
//! adding a row here, never a new code path.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tent_config::Category;
use tent_slots::SlotSchema;
use thiserror::Error;

/// Synthetic sensor type for vapour pressure deficit
pub const VPD: &str = "vpd";

/// Catalog validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("chain '{0}' is declared twice")]
    DuplicateTemplate(String),

    #[error("chain '{template_id}' references unknown {category} slot '{slot}'")]
    UnknownSlot {
        template_id: String,
        category: Category,
        slot: String,
    },

    #[error("chain '{0}' compares a value but names no sensor or default threshold")]
    MissingThreshold(String),

    #[error("chain '{0}' is time based but has no schedule keys")]
    MissingSchedule(String),

    #[error("chain '{0}' reads a derived sensor but requires no slots")]
    MissingRequires(String),
}

/// How a chain decides to drive its actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainCondition {
    Above,
    Below,
    Time,
    State,
}

impl ChainCondition {
    pub fn is_numeric(self) -> bool {
        matches!(self, ChainCondition::Above | ChainCondition::Below)
    }
}

/// Schedule keys read by a time-based chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleKeys {
    pub on: String,
    pub off: String,
}

/// One catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub template_id: String,
    pub name: String,
    /// Sensor slot key, or [`VPD`]
    pub sensor_type: Option<String>,
    /// Actuator slot key
    pub actuator_type: String,
    pub condition: ChainCondition,
    pub default_threshold: Option<f64>,
    /// `TentConfig.targets` key supplying the live threshold
    pub target_key: Option<String>,
    /// Slots that must be filled besides the actuator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleKeys>,
    /// State value that fires a state chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_state: Option<String>,
    pub hysteresis: f64,
}

impl ChainDefinition {
    #[allow(clippy::too_many_arguments)]
    fn numeric(
        template_id: &str,
        name: &str,
        sensor: &str,
        actuator: &str,
        condition: ChainCondition,
        threshold: f64,
        target_key: &str,
        hysteresis: f64,
    ) -> Self {
        Self {
            template_id: template_id.to_string(),
            name: name.to_string(),
            sensor_type: Some(sensor.to_string()),
            actuator_type: actuator.to_string(),
            condition,
            default_threshold: Some(threshold),
            target_key: Some(target_key.to_string()),
            requires: Vec::new(),
            schedule: None,
            trigger_state: None,
            hysteresis,
        }
    }

    /// Sensor slots that must hold an entity for the chain to exist
    ///
    /// `requires` when given; otherwise the sensor slot itself, unless the
    /// sensor is derived.
    pub fn required_sensor_slots(&self) -> Vec<&str> {
        if !self.requires.is_empty() {
            return self.requires.iter().map(String::as_str).collect();
        }
        match self.sensor_type.as_deref() {
            Some(VPD) | None => Vec::new(),
            Some(sensor) => vec![sensor],
        }
    }
}

/// Validated chain table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainCatalog {
    chains: Vec<ChainDefinition>,
}

impl ChainCatalog {
    /// Build a catalog, checking it against the slot schema
    pub fn new(chains: Vec<ChainDefinition>, schema: &SlotSchema) -> Result<Self, CatalogError> {
        let catalog = Self { chains };
        catalog.validate(schema)?;
        Ok(catalog)
    }

    /// The catalog shipped with the dashboard, checked against the built-in
    /// slot schema on first access
    ///
    /// # Panics
    ///
    /// If the built-in table names a slot the schema lacks or repeats a
    /// template id.
    pub fn builtin() -> &'static ChainCatalog {
        static CATALOG: OnceLock<ChainCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| match Self::new(builtin_chains(), SlotSchema::builtin()) {
            Ok(catalog) => catalog,
            Err(e) => panic!("built-in chain catalog is invalid: {}", e),
        })
    }

    pub fn validate(&self, schema: &SlotSchema) -> Result<(), CatalogError> {
        for (i, chain) in self.chains.iter().enumerate() {
            let id = &chain.template_id;
            if self.chains[..i].iter().any(|c| &c.template_id == id) {
                return Err(CatalogError::DuplicateTemplate(id.clone()));
            }

            let unknown = |category, slot: &str| CatalogError::UnknownSlot {
                template_id: id.clone(),
                category,
                slot: slot.to_string(),
            };
            if schema.get(Category::Actuators, &chain.actuator_type).is_none() {
                return Err(unknown(Category::Actuators, &chain.actuator_type));
            }
            if let Some(sensor) = chain.sensor_type.as_deref() {
                if sensor != VPD && schema.get(Category::Sensors, sensor).is_none() {
                    return Err(unknown(Category::Sensors, sensor));
                }
                if sensor == VPD && chain.requires.is_empty() {
                    return Err(CatalogError::MissingRequires(id.clone()));
                }
            }
            if let Some(slot) = chain
                .requires
                .iter()
                .find(|s| schema.get(Category::Sensors, s.as_str()).is_none())
            {
                return Err(unknown(Category::Sensors, slot));
            }

            match chain.condition {
                ChainCondition::Above | ChainCondition::Below
                    if chain.sensor_type.is_none() || chain.default_threshold.is_none() =>
                {
                    return Err(CatalogError::MissingThreshold(id.clone()));
                }
                ChainCondition::Time if chain.schedule.is_none() => {
                    return Err(CatalogError::MissingSchedule(id.clone()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.chains.iter()
    }

    pub fn get(&self, template_id: &str) -> Option<&ChainDefinition> {
        self.chains.iter().find(|c| c.template_id == template_id)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn builtin_chains() -> Vec<ChainDefinition> {
    use ChainCondition::{Above, Below};

    vec![
        ChainDefinition::numeric(
            "high_temp_exhaust",
            "High Temp - Turn On Exhaust",
            "temperature",
            "exhaust_fan",
            Above,
            28.0,
            "temp_day_max",
            1.0,
        ),
        ChainDefinition::numeric(
            "low_temp_heater",
            "Low Temp - Turn On Heater",
            "temperature",
            "heater",
            Below,
            18.0,
            "temp_day_min",
            1.0,
        ),
        ChainDefinition::numeric(
            "high_temp_ac",
            "High Temp - Turn On A/C",
            "temperature",
            "ac",
            Above,
            30.0,
            "temp_day_max",
            1.0,
        ),
        ChainDefinition::numeric(
            "low_humidity_humidifier",
            "Low Humidity - Turn On Humidifier",
            "humidity",
            "humidifier",
            Below,
            50.0,
            "humidity_day_min",
            5.0,
        ),
        ChainDefinition::numeric(
            "high_humidity_dehumidifier",
            "High Humidity - Turn On Dehumidifier",
            "humidity",
            "dehumidifier",
            Above,
            70.0,
            "humidity_day_max",
            5.0,
        ),
        ChainDefinition {
            requires: vec!["temperature".into(), "humidity".into()],
            ..ChainDefinition::numeric(
                "high_vpd_humidifier",
                "High VPD - Turn On Humidifier",
                VPD,
                "humidifier",
                Above,
                1.4,
                "vpd_max",
                0.2,
            )
        },
        ChainDefinition {
            template_id: "light_schedule".into(),
            name: "Light Schedule".into(),
            sensor_type: None,
            actuator_type: "light".into(),
            condition: ChainCondition::Time,
            default_threshold: None,
            target_key: None,
            requires: Vec::new(),
            schedule: Some(ScheduleKeys {
                on: "photoperiod_on".into(),
                off: "photoperiod_off".into(),
            }),
            trigger_state: None,
            hysteresis: 0.0,
        },
        ChainDefinition {
            template_id: "leak_drain_pump".into(),
            name: "Leak Detected - Run Drain Pump".into(),
            sensor_type: Some("leak_sensor".into()),
            actuator_type: "drain_pump".into(),
            condition: ChainCondition::State,
            default_threshold: None,
            target_key: None,
            requires: Vec::new(),
            schedule: None,
            trigger_state: Some("on".into()),
            hysteresis: 0.0,
        },
    ]
}
