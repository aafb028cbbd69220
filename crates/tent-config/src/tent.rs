//! Tent configuration model
//!
//! [`TentConfig`] is the only structure the dashboard persists. Slot maps use
//! [`IndexMap`] so that the declaration order the user built up survives a
//! save/load cycle unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::assignment::SlotAssignment;
use crate::error::ConfigResult;

/// Which of a tent's two slot maps a slot lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sensors,
    Actuators,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Sensors, Category::Actuators];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sensors => "sensors",
            Category::Actuators => "actuators",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot key to assignment
pub type SlotMap = IndexMap<String, SlotAssignment>;

/// Named numeric thresholds, e.g. `temp_day_max`
pub type Targets = IndexMap<String, f64>;

/// Named time-of-day strings, e.g. `photoperiod_on`
pub type Schedules = IndexMap<String, String>;

/// Default thresholds written into a newly created tent
pub const DEFAULT_TARGETS: &[(&str, f64)] = &[
    ("temp_day_min", 22.0),
    ("temp_day_max", 28.0),
    ("temp_night_min", 18.0),
    ("temp_night_max", 24.0),
    ("humidity_day_min", 50.0),
    ("humidity_day_max", 70.0),
    ("humidity_night_min", 50.0),
    ("humidity_night_max", 65.0),
];

/// Default light schedule written into a newly created tent
pub const DEFAULT_SCHEDULES: &[(&str, &str)] =
    &[("photoperiod_on", "06:00"), ("photoperiod_off", "22:00")];

/// Display customisation for the actuator control panel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Explicit actuator slot display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,

    /// Label overrides keyed by actuator slot
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,

    /// Icon overrides keyed by actuator slot
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub icons: IndexMap<String, String>,
}

/// Per-tent alert switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub alert_temp_out_of_range: bool,
    #[serde(default = "default_true")]
    pub alert_humidity_out_of_range: bool,
    #[serde(default = "default_true")]
    pub alert_leak_detected: bool,
    #[serde(default = "default_true")]
    pub alert_reservoir_low: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_temp_out_of_range: true,
            alert_humidity_out_of_range: true,
            alert_leak_detected: true,
            alert_reservoir_low: true,
        }
    }
}

/// One grow tent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TentConfig {
    /// Stable identifier, generated once
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub sensors: SlotMap,

    #[serde(default)]
    pub actuators: SlotMap,

    #[serde(default)]
    pub targets: Targets,

    #[serde(default)]
    pub schedules: Schedules,

    #[serde(default)]
    pub control_settings: ControlSettings,

    #[serde(default)]
    pub notifications: Notifications,
}

impl TentConfig {
    /// Create an empty tent with a freshly generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(generate_tent_id(), name)
    }

    /// Create an empty tent with a caller-supplied id
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            sensors: SlotMap::new(),
            actuators: SlotMap::new(),
            targets: Targets::new(),
            schedules: Schedules::new(),
            control_settings: ControlSettings::default(),
            notifications: Notifications::default(),
        }
    }

    /// Fill in default targets and schedules where none are set
    pub fn apply_defaults(&mut self) {
        if self.targets.is_empty() {
            self.targets = DEFAULT_TARGETS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect();
        }
        if self.schedules.is_empty() {
            self.schedules = DEFAULT_SCHEDULES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
    }

    pub fn slots(&self, category: Category) -> &SlotMap {
        match category {
            Category::Sensors => &self.sensors,
            Category::Actuators => &self.actuators,
        }
    }

    pub fn slots_mut(&mut self, category: Category) -> &mut SlotMap {
        match category {
            Category::Sensors => &mut self.sensors,
            Category::Actuators => &mut self.actuators,
        }
    }

    /// The assignment for a slot; absent slots read as `Empty`
    pub fn assignment(&self, category: Category, slot: &str) -> &SlotAssignment {
        static EMPTY: SlotAssignment = SlotAssignment::Empty;
        self.slots(category).get(slot).unwrap_or(&EMPTY)
    }

    /// True when the slot key exists and holds at least one entity
    pub fn has_entity(&self, category: Category, slot: &str) -> bool {
        !self.assignment(category, slot).is_empty()
    }

    /// Every assigned entity id with the slot holding it
    pub fn all_entities(&self) -> impl Iterator<Item = (Category, &str, &str)> {
        Category::ALL.into_iter().flat_map(move |category| {
            self.slots(category).iter().flat_map(move |(slot, assignment)| {
                assignment
                    .ids()
                    .iter()
                    .map(move |id| (category, slot.as_str(), id.as_str()))
            })
        })
    }

    /// Find which slot an entity occupies in this tent
    pub fn slot_of(&self, entity_id: &str) -> Option<(Category, &str)> {
        self.all_entities()
            .find(|(_, _, id)| *id == entity_id)
            .map(|(category, slot, _)| (category, slot))
    }

    /// Target value, if one has been set
    pub fn target(&self, key: &str) -> Option<f64> {
        self.targets.get(key).copied()
    }

    pub fn export_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn import_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Generate a tent id that is never reused
pub fn generate_tent_id() -> String {
    format!("tent_{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Full dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub tents: Vec<TentConfig>,

    #[serde(default, rename = "hiddenEntities")]
    pub hidden_entities: Vec<String>,

    #[serde(default, rename = "hiddenGroups")]
    pub hidden_groups: Vec<String>,

    #[serde(default, rename = "customNames")]
    pub custom_names: IndexMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            tents: Vec::new(),
            hidden_entities: Vec::new(),
            hidden_groups: Vec::new(),
            custom_names: IndexMap::new(),
        }
    }
}

impl AppConfig {
    pub fn tent(&self, tent_id: &str) -> Option<&TentConfig> {
        self.tents.iter().find(|t| t.id == tent_id)
    }

    pub fn tent_index(&self, tent_id: &str) -> Option<usize> {
        self.tents.iter().position(|t| t.id == tent_id)
    }

    pub fn export_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn import_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
