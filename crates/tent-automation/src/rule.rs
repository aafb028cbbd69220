//! Automation rules
//!
//! The record shape the automation registry stores. On the wire a rule is a
//! flat object (`trigger_type`, `trigger_sensor`, `action_type`, ...); here
//! the trigger is a tagged enum so every read site handles each kind.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tent_config::{Category, TentConfig};

use crate::catalog::{ChainCondition, ChainDefinition};
use crate::chain::{resolve_schedule, resolve_threshold};
use crate::error::{AutomationError, AutomationResult};

/// Parse an `HH:MM` time of day
pub fn parse_time(value: &str) -> AutomationResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AutomationError::InvalidTime(value.to_string()))
}

/// What starts a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum RuleTrigger {
    SensorAbove {
        #[serde(rename = "trigger_sensor")]
        sensor: String,
        #[serde(rename = "trigger_value")]
        value: f64,
    },
    SensorBelow {
        #[serde(rename = "trigger_sensor")]
        sensor: String,
        #[serde(rename = "trigger_value")]
        value: f64,
    },
    /// Fires when the value leaves `[min, max]`
    SensorRange {
        #[serde(rename = "trigger_sensor")]
        sensor: String,
        #[serde(rename = "trigger_value")]
        min: f64,
        #[serde(rename = "trigger_value_max")]
        max: f64,
    },
    /// Fires when a sensor reports the given state
    SensorState {
        #[serde(rename = "trigger_sensor")]
        sensor: String,
        #[serde(rename = "trigger_state")]
        state: String,
    },
    Schedule {
        #[serde(rename = "trigger_schedule_on")]
        on: String,
        #[serde(rename = "trigger_schedule_off")]
        off: String,
    },
}

impl RuleTrigger {
    /// Sensor the trigger watches, if any
    pub fn sensor(&self) -> Option<&str> {
        match self {
            RuleTrigger::SensorAbove { sensor, .. }
            | RuleTrigger::SensorBelow { sensor, .. }
            | RuleTrigger::SensorRange { sensor, .. }
            | RuleTrigger::SensorState { sensor, .. } => Some(sensor),
            RuleTrigger::Schedule { .. } => None,
        }
    }

    /// Numeric sensor triggers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            RuleTrigger::SensorAbove { .. }
                | RuleTrigger::SensorBelow { .. }
                | RuleTrigger::SensorRange { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RuleTrigger::SensorAbove { .. } => "sensor_above",
            RuleTrigger::SensorBelow { .. } => "sensor_below",
            RuleTrigger::SensorRange { .. } => "sensor_range",
            RuleTrigger::SensorState { .. } => "sensor_state",
            RuleTrigger::Schedule { .. } => "schedule",
        }
    }
}

/// What a rule does to its actuator when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    TurnOn,
    TurnOff,
    SetSpeed,
}

/// One automation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub tent_id: String,

    #[serde(flatten)]
    pub trigger: RuleTrigger,

    #[serde(rename = "action_type")]
    pub action: RuleAction,
    /// Actuator slot key
    #[serde(rename = "action_actuator")]
    pub actuator: String,
    /// Speed percentage for `set_speed`
    #[serde(rename = "action_value", default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,

    /// Dead band before a triggered rule reverts
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,
    /// Seconds the actuator stays on before the rule may turn it off
    #[serde(default = "default_min_duration")]
    pub min_on_duration: u64,
    /// Seconds the actuator stays off before the rule may turn it on
    #[serde(default = "default_min_duration")]
    pub min_off_duration: u64,
    /// Seconds between any two actions
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,

    /// Chain this rule was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_hysteresis() -> f64 {
    0.5
}

fn default_min_duration() -> u64 {
    60
}

fn default_cooldown() -> u64 {
    30
}

/// Generate a new rule id
pub fn generate_rule_id() -> String {
    format!("rule_{}", ulid::Ulid::new().to_string().to_lowercase())
}

impl AutomationRule {
    pub fn new(
        tent_id: impl Into<String>,
        name: impl Into<String>,
        trigger: RuleTrigger,
        action: RuleAction,
        actuator: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_rule_id(),
            name: name.into(),
            enabled: true,
            tent_id: tent_id.into(),
            trigger,
            action,
            actuator: actuator.into(),
            speed: None,
            hysteresis: default_hysteresis(),
            min_on_duration: default_min_duration(),
            min_off_duration: default_min_duration(),
            cooldown: default_cooldown(),
            template_id: None,
        }
    }

    /// Check field combinations serde cannot express
    pub fn validate(&self) -> AutomationResult<()> {
        let invalid = |msg: String| Err(AutomationError::InvalidConfig(msg));
        match &self.trigger {
            RuleTrigger::SensorRange { min, max, .. } if min > max => {
                return invalid(format!("rule {}: range {} > {}", self.id, min, max));
            }
            RuleTrigger::Schedule { on, off } => {
                parse_time(on)?;
                parse_time(off)?;
            }
            _ => {}
        }
        if self.action == RuleAction::SetSpeed && self.speed.map_or(true, |s| s > 100) {
            return invalid(format!("rule {}: set_speed needs a value 0-100", self.id));
        }
        if !self.hysteresis.is_finite() || self.hysteresis < 0.0 {
            return invalid(format!("rule {}: hysteresis must be >= 0", self.id));
        }
        Ok(())
    }

    /// Entities the rule drives in its tent
    pub fn target_entities<'t>(&self, tent: &'t TentConfig) -> &'t [String] {
        tent.assignment(Category::Actuators, &self.actuator).ids()
    }
}

/// Caller overrides when creating a rule from a chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_off: Option<String>,
}

/// Build the automation rule that backs a chain in a tent
pub fn rule_from_chain(
    def: &ChainDefinition,
    tent: &TentConfig,
    params: &ChainParams,
) -> AutomationResult<AutomationRule> {
    let sensor = || {
        def.sensor_type
            .clone()
            .ok_or_else(|| AutomationError::InvalidConfig(format!("{} has no sensor", def.template_id)))
    };
    let threshold = || {
        params
            .threshold
            .or_else(|| resolve_threshold(def, tent))
            .ok_or_else(|| AutomationError::NoThreshold(def.template_id.clone()))
    };

    let trigger = match def.condition {
        ChainCondition::Above => RuleTrigger::SensorAbove {
            sensor: sensor()?,
            value: threshold()?,
        },
        ChainCondition::Below => RuleTrigger::SensorBelow {
            sensor: sensor()?,
            value: threshold()?,
        },
        ChainCondition::State => RuleTrigger::SensorState {
            sensor: sensor()?,
            state: def.trigger_state.clone().unwrap_or_else(|| "on".into()),
        },
        ChainCondition::Time => {
            let keys = def
                .schedule
                .as_ref()
                .ok_or_else(|| AutomationError::NoThreshold(def.template_id.clone()))?;
            let chain_time = |over: &Option<String>, key: &str| {
                over.clone()
                    .or_else(|| resolve_schedule(tent, key))
                    .ok_or_else(|| AutomationError::InvalidTime(key.to_string()))
            };
            RuleTrigger::Schedule {
                on: chain_time(&params.schedule_on, &keys.on)?,
                off: chain_time(&params.schedule_off, &keys.off)?,
            }
        }
    };

    let mut rule = AutomationRule::new(
        tent.id.clone(),
        def.name.clone(),
        trigger,
        RuleAction::TurnOn,
        def.actuator_type.clone(),
    );
    if def.hysteresis > 0.0 {
        rule.hysteresis = def.hysteresis;
    }
    rule.template_id = Some(def.template_id.clone());
    rule.validate()?;
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChainCatalog;
    use serde_json::json;

    #[test]
    fn test_flat_wire_shape() {
        let rule: AutomationRule = serde_json::from_value(json!({
            "id": "rule_1",
            "name": "High Temp",
            "tent_id": "t1",
            "trigger_type": "sensor_above",
            "trigger_sensor": "temperature",
            "trigger_value": 28,
            "action_type": "turn_on",
            "action_actuator": "exhaust_fan",
            "hysteresis": 1.0
        }))
        .unwrap();

        assert!(rule.enabled);
        assert_eq!(
            rule.trigger,
            RuleTrigger::SensorAbove {
                sensor: "temperature".into(),
                value: 28.0
            }
        );
        assert_eq!(rule.cooldown, 30);
        assert_eq!(rule.min_on_duration, 60);

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["trigger_type"], "sensor_above");
        assert_eq!(value["trigger_sensor"], "temperature");
        assert_eq!(value["action_actuator"], "exhaust_fan");
        assert!(value.get("action_value").is_none());
    }

    #[test]
    fn test_schedule_and_range_shapes() {
        let rule: AutomationRule = serde_json::from_value(json!({
            "id": "r", "name": "Lights", "tent_id": "t1",
            "trigger_type": "schedule",
            "trigger_schedule_on": "06:00",
            "trigger_schedule_off": "00:00",
            "action_type": "turn_on",
            "action_actuator": "light"
        }))
        .unwrap();
        assert_eq!(rule.trigger.sensor(), None);
        rule.validate().unwrap();

        let range: AutomationRule = serde_json::from_value(json!({
            "id": "r2", "name": "Band", "tent_id": "t1",
            "trigger_type": "sensor_range",
            "trigger_sensor": "humidity",
            "trigger_value": 70, "trigger_value_max": 50,
            "action_type": "turn_on", "action_actuator": "dehumidifier"
        }))
        .unwrap();
        assert!(range.validate().is_err());
    }

    #[test]
    fn test_set_speed_needs_value() {
        let mut rule = AutomationRule::new(
            "t1",
            "Fan",
            RuleTrigger::SensorAbove {
                sensor: "temperature".into(),
                value: 27.0,
            },
            RuleAction::SetSpeed,
            "exhaust_fan",
        );
        assert!(rule.validate().is_err());
        rule.speed = Some(60);
        rule.validate().unwrap();
    }

    #[test]
    fn test_rule_from_chain_uses_tent_target() {
        let catalog = ChainCatalog::builtin();
        let mut tent = TentConfig::with_id("t1", "Tent 1");
        tent.targets.insert("temp_day_max".into(), 27.0);

        let rule = rule_from_chain(
            catalog.get("high_temp_exhaust").unwrap(),
            &tent,
            &ChainParams::default(),
        )
        .unwrap();
        assert_eq!(rule.tent_id, "t1");
        assert_eq!(rule.template_id.as_deref(), Some("high_temp_exhaust"));
        assert_eq!(rule.hysteresis, 1.0);
        assert_eq!(
            rule.trigger,
            RuleTrigger::SensorAbove {
                sensor: "temperature".into(),
                value: 27.0
            }
        );

        let overridden = rule_from_chain(
            catalog.get("high_temp_exhaust").unwrap(),
            &tent,
            &ChainParams {
                threshold: Some(26.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            overridden.trigger,
            RuleTrigger::SensorAbove { value, .. } if value == 26.0
        ));
    }

    #[test]
    fn test_rule_from_time_and_state_chains() {
        let catalog = ChainCatalog::builtin();
        let tent = TentConfig::with_id("t1", "Tent 1");

        let lights = rule_from_chain(
            catalog.get("light_schedule").unwrap(),
            &tent,
            &ChainParams {
                schedule_off: Some("00:00".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            lights.trigger,
            RuleTrigger::Schedule {
                on: "06:00".into(),
                off: "00:00".into()
            }
        );
        assert_eq!(lights.hysteresis, 0.5);

        let drain = rule_from_chain(
            catalog.get("leak_drain_pump").unwrap(),
            &tent,
            &ChainParams::default(),
        )
        .unwrap();
        assert_eq!(drain.trigger.kind(), "sensor_state");
        assert_eq!(drain.actuator, "drain_pump");
    }
}
