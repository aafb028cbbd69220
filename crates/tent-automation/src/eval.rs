//! Rule evaluation
//!
//! [`evaluate`] is a pure step function: given a rule, its current
//! [`RuleState`], an input and the current time it returns the action to
//! issue, if any. [`RuleEvaluator`] keeps one state per rule. Its
//! [`decide`](RuleEvaluator::decide) leaves the state untouched;
//! [`commit`](RuleEvaluator::commit) records a step once the action was
//! actually carried out, so a failed command is retried on the next input.
//!
//! Numeric triggers use a dead band: a `sensor_above` rule fires when the
//! value rises above the threshold and reverts only once it falls below
//! `threshold - hysteresis`. Cooldown and minimum on/off durations gate
//! every sensor step; schedule steps fire on the exact `HH:MM` minute.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rule::{parse_time, AutomationRule, RuleAction, RuleTrigger};

/// Power direction of an issued action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    On,
    Off,
}

impl Power {
    fn invert(self) -> Self {
        match self {
            Power::On => Power::Off,
            Power::Off => Power::On,
        }
    }
}

/// Command sent to an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum Command {
    TurnOn,
    TurnOff,
    SetSpeed(u8),
}

/// Input a rule reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleInput<'a> {
    /// Numeric value of the rule's sensor
    Reading(f64),
    /// Raw state of the rule's sensor
    State(&'a str),
    /// Local wall-clock minute
    Clock(NaiveTime),
}

/// Per-rule runtime state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleState {
    pub triggered: bool,
    pub last_action: Option<Power>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub power: Power,
    /// Value of `triggered` after the action
    pub triggered: bool,
}

/// Action to issue for a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub rule_id: String,
    pub tent_id: String,
    /// Actuator slot key
    pub actuator: String,
    pub command: Command,
    /// State transition to commit once the command succeeded
    pub step: Step,
}

/// Snapshot returned by [`RuleEvaluator::status`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStatus {
    pub rule_id: String,
    pub enabled: bool,
    pub triggered: bool,
    pub last_action: Option<Power>,
    pub last_action_time: Option<DateTime<Utc>>,
}

fn seconds_since(then: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    then.map(|t| (now - t).num_seconds())
}

/// Compute the next step for a rule
pub fn evaluate(
    rule: &AutomationRule,
    state: &RuleState,
    input: RuleInput<'_>,
    now: DateTime<Utc>,
) -> Option<Step> {
    if !rule.enabled {
        return None;
    }

    if let (RuleTrigger::Schedule { on, off }, RuleInput::Clock(minute)) = (&rule.trigger, input) {
        return schedule_step(on, off, state, minute);
    }

    if let Some(elapsed) = seconds_since(state.last_action_time, now) {
        if elapsed < rule.cooldown as i64 {
            return None;
        }
    }

    let fire = if rule.action == RuleAction::TurnOff {
        Power::Off
    } else {
        Power::On
    };
    let step = |triggered: bool| Step {
        power: if triggered { fire } else { fire.invert() },
        triggered,
    };

    let next = match (&rule.trigger, input) {
        (RuleTrigger::SensorAbove { value: threshold, .. }, RuleInput::Reading(value)) => {
            if value > *threshold && !state.triggered {
                Some(step(true))
            } else if value < threshold - rule.hysteresis && state.triggered {
                Some(step(false))
            } else {
                None
            }
        }
        (RuleTrigger::SensorBelow { value: threshold, .. }, RuleInput::Reading(value)) => {
            if value < *threshold && !state.triggered {
                Some(step(true))
            } else if value > threshold + rule.hysteresis && state.triggered {
                Some(step(false))
            } else {
                None
            }
        }
        (RuleTrigger::SensorRange { min, max, .. }, RuleInput::Reading(value)) => {
            let outside = value < *min || value > *max;
            if outside && !state.triggered {
                Some(step(true))
            } else if !outside && state.triggered {
                Some(step(false))
            } else {
                None
            }
        }
        (RuleTrigger::SensorState { state: wanted, .. }, RuleInput::State(current)) => {
            let matches = current == wanted.as_str();
            if matches && !state.triggered {
                Some(step(true))
            } else if !matches && state.triggered {
                Some(step(false))
            } else {
                None
            }
        }
        _ => None,
    }?;

    if let (Some(last), Some(elapsed)) = (
        state.last_action,
        seconds_since(state.last_action_time, now),
    ) {
        let min = match last {
            Power::On => rule.min_on_duration,
            Power::Off => rule.min_off_duration,
        };
        if elapsed < min as i64 {
            return None;
        }
    }

    Some(next)
}

fn schedule_step(on: &str, off: &str, state: &RuleState, minute: NaiveTime) -> Option<Step> {
    let at = |value: &str| parse_time(value).map(|t| t == minute).unwrap_or(false);
    if at(on) && state.last_action != Some(Power::On) {
        Some(Step {
            power: Power::On,
            triggered: true,
        })
    } else if at(off) && state.last_action != Some(Power::Off) {
        Some(Step {
            power: Power::Off,
            triggered: false,
        })
    } else {
        None
    }
}

/// Turn a step into the command for the rule's actuator
pub fn command_for(rule: &AutomationRule, power: Power) -> Command {
    match (power, rule.action, rule.speed) {
        (Power::On, RuleAction::SetSpeed, Some(speed)) => Command::SetSpeed(speed),
        (Power::On, _, _) => Command::TurnOn,
        (Power::Off, _, _) => Command::TurnOff,
    }
}

/// Holds runtime state for a set of rules
#[derive(Debug, Default)]
pub struct RuleEvaluator {
    states: HashMap<String, RuleState>,
}

impl RuleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, rule_id: &str) -> Option<&RuleState> {
        self.states.get(rule_id)
    }

    /// Decide what a rule should do without touching its state
    pub fn decide(
        &self,
        rule: &AutomationRule,
        input: RuleInput<'_>,
        now: DateTime<Utc>,
    ) -> Option<Decision> {
        let idle = RuleState::default();
        let state = self.states.get(&rule.id).unwrap_or(&idle);
        let step = evaluate(rule, state, input, now)?;

        Some(Decision {
            rule_id: rule.id.clone(),
            tent_id: rule.tent_id.clone(),
            actuator: rule.actuator.clone(),
            command: command_for(rule, step.power),
            step,
        })
    }

    /// Record a step whose action was carried out
    pub fn commit(&mut self, rule_id: &str, step: Step, now: DateTime<Utc>) {
        let state = self.states.entry(rule_id.to_string()).or_default();
        state.triggered = step.triggered;
        state.last_action = Some(step.power);
        state.last_action_time = Some(now);
        info!("Rule {} committed {:?}", rule_id, step.power);
    }

    /// Decide and commit at once, for callers whose actions cannot fail
    pub fn evaluate(
        &mut self,
        rule: &AutomationRule,
        input: RuleInput<'_>,
        now: DateTime<Utc>,
    ) -> Option<Decision> {
        let decision = self.decide(rule, input, now)?;
        self.commit(&decision.rule_id, decision.step, now);
        Some(decision)
    }

    /// Feed a numeric reading to every rule of the tent watching `sensor`
    pub fn on_reading(
        &mut self,
        rules: &[AutomationRule],
        tent_id: &str,
        sensor: &str,
        value: f64,
        now: DateTime<Utc>,
    ) -> Vec<Decision> {
        debug!("Reading {}/{} = {}", tent_id, sensor, value);
        rules
            .iter()
            .filter(|r| r.tent_id == tent_id && r.trigger.is_numeric())
            .filter(|r| r.trigger.sensor() == Some(sensor))
            .filter_map(|r| self.evaluate(r, RuleInput::Reading(value), now))
            .collect()
    }

    /// Feed a sensor state to every state rule of the tent watching `sensor`
    pub fn on_state(
        &mut self,
        rules: &[AutomationRule],
        tent_id: &str,
        sensor: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Vec<Decision> {
        rules
            .iter()
            .filter(|r| r.tent_id == tent_id)
            .filter(|r| matches!(&r.trigger, RuleTrigger::SensorState { sensor: s, .. } if s == sensor))
            .filter_map(|r| self.evaluate(r, RuleInput::State(value), now))
            .collect()
    }

    /// Run every schedule rule against the given local minute
    pub fn on_clock(
        &mut self,
        rules: &[AutomationRule],
        minute: NaiveTime,
        now: DateTime<Utc>,
    ) -> Vec<Decision> {
        rules
            .iter()
            .filter(|r| matches!(r.trigger, RuleTrigger::Schedule { .. }))
            .filter_map(|r| self.evaluate(r, RuleInput::Clock(minute), now))
            .collect()
    }

    /// Drop state of rules that no longer exist
    pub fn retain(&mut self, rules: &[AutomationRule]) {
        self.states
            .retain(|id, _| rules.iter().any(|r| &r.id == id));
    }

    pub fn status(&self, rule: &AutomationRule) -> RuleStatus {
        let state = self.states.get(&rule.id).cloned().unwrap_or_default();
        RuleStatus {
            rule_id: rule.id.clone(),
            enabled: rule.enabled,
            triggered: state.triggered,
            last_action: state.last_action,
            last_action_time: state.last_action_time,
        }
    }
}
