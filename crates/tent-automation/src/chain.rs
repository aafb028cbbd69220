//! Chain derivation
//!
//! Binds catalog rows to one tent. A chain exists for a tent when its
//! actuator slot and every required sensor slot hold an entity; its
//! threshold, live values and status are resolved on every call and never
//! stored.

use serde::{Deserialize, Serialize};
use tent_config::{Category, TentConfig, DEFAULT_SCHEDULES};
use tent_core::TemperatureUnit;
use tracing::debug;

use crate::catalog::{ChainCatalog, ChainCondition, ChainDefinition};
use crate::error::{AutomationError, AutomationResult};
use crate::readings::{sensor_value, LiveReadings};
use crate::rule::parse_time;

/// Whether a derivable chain is backed by a real automation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Active,
    Missing,
}

/// A derivable chain not yet instantiated as an automation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingChain {
    pub tent_id: String,
    pub template_id: String,
}

impl MissingChain {
    pub fn new(tent_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            tent_id: tent_id.into(),
            template_id: template_id.into(),
        }
    }
}

/// A catalog chain bound to one tent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainInstance {
    pub tent_id: String,
    pub template_id: String,
    pub name: String,
    pub sensor_type: Option<String>,
    pub actuator_type: String,
    pub condition: ChainCondition,
    /// Canonical unit (°C for temperatures)
    pub threshold: Option<f64>,
    pub target_key: Option<String>,
    pub schedule_on: Option<String>,
    pub schedule_off: Option<String>,
    pub sensor_value: Option<f64>,
    pub sensor_state: Option<String>,
    pub actuator_state: Option<String>,
    pub status: ChainStatus,
}

impl ChainInstance {
    pub fn is_missing(&self) -> bool {
        self.status == ChainStatus::Missing
    }

    fn is_temperature(&self) -> bool {
        self.sensor_type.as_deref() == Some("temperature")
    }

    /// Threshold converted for display
    pub fn threshold_in(&self, unit: TemperatureUnit) -> Option<f64> {
        self.threshold.map(|t| convert_for_display(self.is_temperature(), t, unit))
    }

    /// Sensor value converted for display
    pub fn sensor_value_in(&self, unit: TemperatureUnit) -> Option<f64> {
        self.sensor_value
            .map(|v| convert_for_display(self.is_temperature(), v, unit))
    }
}

fn convert_for_display(is_temperature: bool, value: f64, unit: TemperatureUnit) -> f64 {
    if is_temperature {
        unit.from_celsius(value)
    } else {
        value
    }
}

/// Does the tent hold every entity the chain needs?
pub fn is_derivable(def: &ChainDefinition, tent: &TentConfig) -> bool {
    tent.has_entity(Category::Actuators, &def.actuator_type)
        && def
            .required_sensor_slots()
            .iter()
            .all(|slot| tent.has_entity(Category::Sensors, slot))
}

/// The tent target when set, otherwise the catalog default
pub fn resolve_threshold(def: &ChainDefinition, tent: &TentConfig) -> Option<f64> {
    def.target_key
        .as_deref()
        .and_then(|key| tent.target(key))
        .or(def.default_threshold)
}

pub(crate) fn resolve_schedule(tent: &TentConfig, key: &str) -> Option<String> {
    tent.schedules.get(key).cloned().or_else(|| {
        DEFAULT_SCHEDULES
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
}

fn bind(
    def: &ChainDefinition,
    tent: &TentConfig,
    readings: &dyn LiveReadings,
    missing: &[MissingChain],
) -> ChainInstance {
    let sensor = def.sensor_type.as_deref();
    let status = if missing
        .iter()
        .any(|m| m.tent_id == tent.id && m.template_id == def.template_id)
    {
        ChainStatus::Missing
    } else {
        ChainStatus::Active
    };

    ChainInstance {
        tent_id: tent.id.clone(),
        template_id: def.template_id.clone(),
        name: def.name.clone(),
        sensor_type: def.sensor_type.clone(),
        actuator_type: def.actuator_type.clone(),
        condition: def.condition,
        threshold: resolve_threshold(def, tent),
        target_key: def.target_key.clone(),
        schedule_on: def
            .schedule
            .as_ref()
            .and_then(|s| resolve_schedule(tent, &s.on)),
        schedule_off: def
            .schedule
            .as_ref()
            .and_then(|s| resolve_schedule(tent, &s.off)),
        sensor_value: sensor.and_then(|s| sensor_value(readings, s)),
        sensor_state: sensor
            .and_then(|s| readings.sensor_state(s))
            .map(str::to_string),
        actuator_state: readings
            .actuator_state(&def.actuator_type)
            .map(str::to_string),
        status,
    }
}

/// Every derivable chain of a tent, in catalog order
pub fn build_chains(
    catalog: &ChainCatalog,
    tent: &TentConfig,
    readings: &dyn LiveReadings,
    missing: &[MissingChain],
) -> Vec<ChainInstance> {
    let chains: Vec<ChainInstance> = catalog
        .iter()
        .filter(|def| is_derivable(def, tent))
        .map(|def| bind(def, tent, readings, missing))
        .collect();
    debug!(tent = %tent.id, chains = chains.len(), "Derived chains");
    chains
}

/// Number of chains not yet backed by an automation
pub fn missing_count(chains: &[ChainInstance]) -> usize {
    chains.iter().filter(|c| c.is_missing()).count()
}

fn editable<'c>(catalog: &'c ChainCatalog, template_id: &str) -> AutomationResult<&'c ChainDefinition> {
    catalog
        .get(template_id)
        .ok_or_else(|| AutomationError::UnknownTemplate(template_id.to_string()))
}

/// Write a chain's threshold (canonical unit) through to the tent targets
pub fn set_threshold(
    catalog: &ChainCatalog,
    tent: &mut TentConfig,
    template_id: &str,
    value: f64,
) -> AutomationResult<()> {
    let def = editable(catalog, template_id)?;
    let key = def
        .target_key
        .as_deref()
        .ok_or_else(|| AutomationError::NoThreshold(template_id.to_string()))?;
    if !value.is_finite() {
        return Err(AutomationError::InvalidConfig(format!(
            "threshold for {} must be a number",
            template_id
        )));
    }
    tent.targets.insert(key.to_string(), value);
    debug!(tent = %tent.id, key, value, "Set chain threshold");
    Ok(())
}

/// Write a threshold entered in a display unit
pub fn set_threshold_display(
    catalog: &ChainCatalog,
    tent: &mut TentConfig,
    template_id: &str,
    value: f64,
    unit: TemperatureUnit,
) -> AutomationResult<()> {
    let def = editable(catalog, template_id)?;
    let canonical = if def.sensor_type.as_deref() == Some("temperature") {
        unit.to_celsius(value)
    } else {
        value
    };
    set_threshold(catalog, tent, template_id, canonical)
}

/// Write a time chain's on/off times through to the tent schedules
pub fn set_schedule(
    catalog: &ChainCatalog,
    tent: &mut TentConfig,
    template_id: &str,
    on: &str,
    off: &str,
) -> AutomationResult<()> {
    let def = editable(catalog, template_id)?;
    let keys = def
        .schedule
        .as_ref()
        .ok_or_else(|| AutomationError::NoThreshold(template_id.to_string()))?;
    parse_time(on)?;
    parse_time(off)?;
    tent.schedules.insert(keys.on.clone(), on.to_string());
    tent.schedules.insert(keys.off.clone(), off.to_string());
    Ok(())
}
