//! Missing-chain suggestions
//!
//! A chain is missing when a tent can derive it but no rule backs it yet.

use tent_config::TentConfig;
use tracing::debug;

use crate::catalog::{ChainCatalog, ChainDefinition};
use crate::chain::{is_derivable, MissingChain};
use crate::rule::AutomationRule;

/// Whether `rule` already implements `def` for `tent_id`
pub fn backs_chain(rule: &AutomationRule, def: &ChainDefinition, tent_id: &str) -> bool {
    if rule.tent_id != tent_id {
        return false;
    }
    if let Some(template) = &rule.template_id {
        return template == &def.template_id;
    }
    // hand-written rules count when they drive the same pair
    rule.actuator == def.actuator_type && rule.trigger.sensor() == def.sensor_type.as_deref()
}

/// Derivable chains of every tent that no rule backs
pub fn missing_suggestions(
    catalog: &ChainCatalog,
    tents: &[TentConfig],
    rules: &[AutomationRule],
) -> Vec<MissingChain> {
    let missing: Vec<MissingChain> = tents
        .iter()
        .flat_map(move |tent| {
            catalog
                .iter()
                .filter(move |def| is_derivable(def, tent))
                .filter(move |def| !rules.iter().any(|r| backs_chain(r, def, &tent.id)))
                .map(move |def| MissingChain::new(tent.id.clone(), def.template_id.clone()))
        })
        .collect();
    debug!("{} missing chains across {} tents", missing.len(), tents.len());
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{rule_from_chain, ChainParams, RuleAction, RuleTrigger};
    use tent_config::{Category, SlotAssignment};

    fn tent(id: &str) -> TentConfig {
        let mut tent = TentConfig::with_id(id, id);
        tent.slots_mut(Category::Sensors)
            .insert("temperature".into(), SlotAssignment::single("sensor.temp"));
        tent.slots_mut(Category::Actuators)
            .insert("exhaust_fan".into(), SlotAssignment::single("fan.exhaust"));
        tent.slots_mut(Category::Actuators)
            .insert("light".into(), SlotAssignment::single("light.main"));
        tent
    }

    #[test]
    fn test_all_missing_without_rules() {
        let missing = missing_suggestions(ChainCatalog::builtin(), &[tent("t1")], &[]);
        let ids: Vec<_> = missing.iter().map(|m| m.template_id.as_str()).collect();
        assert_eq!(ids, vec!["high_temp_exhaust", "light_schedule"]);
        assert!(missing.iter().all(|m| m.tent_id == "t1"));
    }

    #[test]
    fn test_template_rule_backs_only_its_tent() {
        let catalog = ChainCatalog::builtin();
        let t1 = tent("t1");
        let rule = rule_from_chain(
            catalog.get("high_temp_exhaust").unwrap(),
            &t1,
            &ChainParams::default(),
        )
        .unwrap();

        let missing = missing_suggestions(catalog, &[t1, tent("t2")], &[rule]);
        assert!(!missing.contains(&MissingChain::new("t1", "high_temp_exhaust")));
        assert!(missing.contains(&MissingChain::new("t2", "high_temp_exhaust")));
        assert!(missing.contains(&MissingChain::new("t1", "light_schedule")));
    }

    #[test]
    fn test_hand_written_rule_matches_by_pair() {
        let rule = AutomationRule::new(
            "t1",
            "Vent",
            RuleTrigger::SensorAbove {
                sensor: "temperature".into(),
                value: 26.0,
            },
            RuleAction::TurnOn,
            "exhaust_fan",
        );
        let missing = missing_suggestions(ChainCatalog::builtin(), &[tent("t1")], &[rule]);
        assert_eq!(missing, vec![MissingChain::new("t1", "light_schedule")]);
    }
}
