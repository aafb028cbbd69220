//! Conflict detection
//!
//! Pairwise scan over enabled rules. Two rules are compared only when they
//! drive at least one common actuator entity; the entity set of a rule comes
//! from its tent's actuator slot, or `tent_id:slot` when the slot is empty.

use serde::{Deserialize, Serialize};
use tent_config::TentConfig;
use tracing::debug;

use crate::rule::{AutomationRule, RuleAction, RuleTrigger};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Why two rules fight over an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same sensor, firing bands intersect
    OverlappingThresholds,
    /// Different sensors pushing the actuator in opposite directions
    OpposingActions,
    /// A schedule and a sensor rule both driving the device
    ScheduleVsSensor,
    /// Two schedules with intersecting on-windows
    ScheduleOverlap,
}

/// One conflicting pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub automation1: String,
    pub automation2: String,
    pub kind: ConflictKind,
    /// First shared target entity
    pub actuator: String,
    pub detail: String,
}

fn targets(rule: &AutomationRule, tents: &[TentConfig]) -> Vec<String> {
    let ids = tents
        .iter()
        .find(|t| t.id == rule.tent_id)
        .map(|t| rule.target_entities(t))
        .unwrap_or_default();
    if ids.is_empty() {
        vec![format!("{}:{}", rule.tent_id, rule.actuator)]
    } else {
        ids.to_vec()
    }
}

/// Open intervals on which a numeric trigger fires
fn firing_bands(trigger: &RuleTrigger) -> Vec<(f64, f64)> {
    match trigger {
        RuleTrigger::SensorAbove { value, .. } => vec![(*value, f64::INFINITY)],
        RuleTrigger::SensorBelow { value, .. } => vec![(f64::NEG_INFINITY, *value)],
        RuleTrigger::SensorRange { min, max, .. } => {
            vec![(f64::NEG_INFINITY, *min), (*max, f64::INFINITY)]
        }
        _ => Vec::new(),
    }
}

fn bands_overlap(a: &RuleTrigger, b: &RuleTrigger) -> bool {
    let (a, b) = (firing_bands(a), firing_bands(b));
    a.iter()
        .any(|(lo, hi)| b.iter().any(|(lo2, hi2)| lo.max(*lo2) < hi.min(*hi2)))
}

/// Half-open minute segments of a schedule's on-window
fn on_window(on: &str, off: &str) -> Vec<(u32, u32)> {
    let minute = |s: &str| {
        crate::rule::parse_time(s)
            .ok()
            .map(|t| chrono::Timelike::hour(&t) * 60 + chrono::Timelike::minute(&t))
    };
    match (minute(on), minute(off)) {
        (Some(on), Some(off)) if on < off => vec![(on, off)],
        (Some(on), Some(off)) if on > off => vec![(on, MINUTES_PER_DAY), (0, off)],
        _ => Vec::new(),
    }
}

fn windows_overlap(a: &[(u32, u32)], b: &[(u32, u32)]) -> bool {
    a.iter()
        .any(|(s, e)| b.iter().any(|(s2, e2)| s.max(s2) < e.min(e2)))
}

fn drives_on(action: RuleAction) -> bool {
    action != RuleAction::TurnOff
}

fn classify(a: &AutomationRule, b: &AutomationRule) -> Option<(ConflictKind, String)> {
    use RuleTrigger::*;

    match (&a.trigger, &b.trigger) {
        (Schedule { on, off }, Schedule { on: on2, off: off2 }) => {
            windows_overlap(&on_window(on, off), &on_window(on2, off2)).then(|| {
                (
                    ConflictKind::ScheduleOverlap,
                    format!("schedules {}-{} and {}-{} overlap", on, off, on2, off2),
                )
            })
        }
        (Schedule { .. }, _) | (_, Schedule { .. }) => Some((
            ConflictKind::ScheduleVsSensor,
            "a schedule and a sensor rule both drive the device".to_string(),
        )),
        (SensorState { sensor, state }, SensorState { sensor: s2, state: st2 }) if sensor == s2 => {
            (state == st2).then(|| {
                (
                    ConflictKind::OverlappingThresholds,
                    format!("both fire when {} is '{}'", sensor, state),
                )
            })
        }
        (ta, tb) if ta.is_numeric() && tb.is_numeric() && ta.sensor() == tb.sensor() => {
            bands_overlap(ta, tb).then(|| {
                (
                    ConflictKind::OverlappingThresholds,
                    format!(
                        "{} thresholds overlap ({} vs {})",
                        ta.sensor().unwrap_or_default(),
                        ta.kind(),
                        tb.kind()
                    ),
                )
            })
        }
        (ta, tb) if ta.sensor() != tb.sensor() && drives_on(a.action) != drives_on(b.action) => {
            Some((
                ConflictKind::OpposingActions,
                format!(
                    "{} and {} rules push the device in opposite directions",
                    ta.sensor().unwrap_or_default(),
                    tb.sensor().unwrap_or_default()
                ),
            ))
        }
        _ => None,
    }
}

/// Every conflicting pair of enabled rules, in input order
pub fn detect_conflicts(rules: &[AutomationRule], tents: &[TentConfig]) -> Vec<Conflict> {
    let enabled: Vec<(&AutomationRule, Vec<String>)> = rules
        .iter()
        .filter(|r| r.enabled)
        .map(|r| (r, targets(r, tents)))
        .collect();

    let mut conflicts = Vec::new();
    for (i, (a, a_targets)) in enabled.iter().enumerate() {
        for (b, b_targets) in &enabled[i + 1..] {
            let Some(shared) = a_targets.iter().find(|t| b_targets.contains(t)) else {
                continue;
            };
            if let Some((kind, detail)) = classify(a, b) {
                debug!("Conflict {:?}: {} / {}", kind, a.id, b.id);
                conflicts.push(Conflict {
                    automation1: a.id.clone(),
                    automation2: b.id.clone(),
                    kind,
                    actuator: shared.clone(),
                    detail: format!("'{}' vs '{}': {}", a.name, b.name, detail),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use tent_config::{Category, SlotAssignment};

    fn rule(id: &str, trigger: RuleTrigger, action: RuleAction, actuator: &str) -> AutomationRule {
        let mut rule = AutomationRule::new("t1", id, trigger, action, actuator);
        rule.id = id.into();
        rule
    }

    fn above(sensor: &str, value: f64) -> RuleTrigger {
        RuleTrigger::SensorAbove {
            sensor: sensor.into(),
            value,
        }
    }

    fn below(sensor: &str, value: f64) -> RuleTrigger {
        RuleTrigger::SensorBelow {
            sensor: sensor.into(),
            value,
        }
    }

    fn schedule(on: &str, off: &str) -> RuleTrigger {
        RuleTrigger::Schedule {
            on: on.into(),
            off: off.into(),
        }
    }

    fn tent() -> TentConfig {
        let mut tent = TentConfig::with_id("t1", "Tent 1");
        tent.slots_mut(Category::Actuators).insert(
            "exhaust_fan".into(),
            SlotAssignment::multiple(["fan.a", "fan.b"]),
        );
        tent.slots_mut(Category::Actuators)
            .insert("humidifier".into(), SlotAssignment::single("switch.humid"));
        tent
    }

    #[test]
    fn test_overlapping_bands_same_sensor() {
        let rules = vec![
            rule("a", above("temperature", 26.0), RuleAction::TurnOn, "exhaust_fan"),
            rule("b", below("temperature", 28.0), RuleAction::TurnOff, "exhaust_fan"),
            rule("c", below("temperature", 20.0), RuleAction::TurnOff, "exhaust_fan"),
        ];
        let conflicts = detect_conflicts(&rules, &[tent()]);

        assert_eq!(conflicts.len(), 2);
        assert_eq!(
            (conflicts[0].automation1.as_str(), conflicts[0].automation2.as_str()),
            ("a", "b")
        );
        assert_eq!(conflicts[0].kind, ConflictKind::OverlappingThresholds);
        assert_eq!(conflicts[0].actuator, "fan.a");
        // a/c: bands (26, inf) and (-inf, 20) are disjoint
        assert_eq!(
            (conflicts[1].automation1.as_str(), conflicts[1].automation2.as_str()),
            ("b", "c")
        );
    }

    #[test]
    fn test_range_overlaps_everything() {
        let range = RuleTrigger::SensorRange {
            sensor: "humidity".into(),
            min: 50.0,
            max: 70.0,
        };
        assert!(bands_overlap(&range, &above("humidity", 90.0)));
        assert!(bands_overlap(&range, &below("humidity", 10.0)));
        assert!(!bands_overlap(&above("humidity", 60.0), &below("humidity", 60.0)));
    }

    #[test]
    fn test_different_actuators_never_conflict() {
        let rules = vec![
            rule("a", above("temperature", 26.0), RuleAction::TurnOn, "exhaust_fan"),
            rule("b", above("temperature", 26.0), RuleAction::TurnOn, "humidifier"),
        ];
        assert!(detect_conflicts(&rules, &[tent()]).is_empty());
    }

    #[test]
    fn test_schedule_vs_sensor_and_opposing() {
        let rules = vec![
            rule("lights", schedule("06:00", "22:00"), RuleAction::TurnOn, "exhaust_fan"),
            rule("heat", above("temperature", 28.0), RuleAction::TurnOn, "exhaust_fan"),
            rule("dry", below("humidity", 40.0), RuleAction::TurnOff, "exhaust_fan"),
        ];
        let conflicts = detect_conflicts(&rules, &[tent()]);
        let kinds: Vec<_> = conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConflictKind::ScheduleVsSensor,
                ConflictKind::ScheduleVsSensor,
                ConflictKind::OpposingActions
            ]
        );
    }

    #[test]
    fn test_schedule_windows_wrap_midnight() {
        let rules = vec![
            rule("night", schedule("20:00", "02:00"), RuleAction::TurnOn, "light"),
            rule("early", schedule("01:00", "05:00"), RuleAction::TurnOn, "light"),
            rule("day", schedule("06:00", "12:00"), RuleAction::TurnOn, "light"),
        ];
        // no light assigned: targets fall back to "t1:light"
        let conflicts = detect_conflicts(&rules, &[tent()]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ScheduleOverlap);
        assert_eq!(conflicts[0].actuator, "t1:light");
        assert_eq!(conflicts[0].automation2, "early");
    }

    #[test]
    fn test_disabled_rules_ignored() {
        let mut rules = vec![
            rule("a", above("temperature", 26.0), RuleAction::TurnOn, "exhaust_fan"),
            rule("b", above("temperature", 27.0), RuleAction::TurnOn, "exhaust_fan"),
        ];
        assert_eq!(detect_conflicts(&rules, &[tent()]).len(), 1);
        rules[1].enabled = false;
        assert!(detect_conflicts(&rules, &[tent()]).is_empty());
    }
}
