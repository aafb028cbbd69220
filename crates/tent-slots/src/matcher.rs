//! Entity/slot compatibility matching
//!
//! An entity may occupy slot X iff its domain is one of X's domains and the
//! device-class rule of X holds. Results keep schema declaration order; the
//! first match is the default pick when a caller needs one suggestion.

use tent_config::{AppConfig, Category};
use tent_core::Entity;

use crate::schema::{SlotDefinition, SlotSchema};

/// A slot an entity can legally occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMatch<'a> {
    pub category: Category,
    pub slot_key: &'a str,
    pub definition: &'a SlotDefinition,
}

/// Every slot the entity may occupy, in declaration order
pub fn compatible_slots<'a>(entity: &Entity, schema: &'a SlotSchema) -> Vec<SlotMatch<'a>> {
    schema
        .iter()
        .filter(|def| def.accepts(entity))
        .map(|def| SlotMatch {
            category: def.category,
            slot_key: def.key.as_str(),
            definition: def,
        })
        .collect()
}

/// The default slot suggestion: the first compatible slot
pub fn suggest_slot<'a>(entity: &Entity, schema: &'a SlotSchema) -> Option<SlotMatch<'a>> {
    compatible_slots(entity, schema).into_iter().next()
}

/// Whether the entity fits a specific slot
pub fn is_compatible(entity: &Entity, schema: &SlotSchema, category: Category, slot: &str) -> bool {
    schema
        .get(category, slot)
        .map(|def| def.accepts(entity))
        .unwrap_or(false)
}

/// Entities that fit at least one slot
///
/// Entities matching nothing are left out here but remain in the raw
/// inventory the caller holds.
pub fn assignable_entities<'e>(entities: &'e [Entity], schema: &SlotSchema) -> Vec<&'e Entity> {
    entities
        .iter()
        .filter(|e| schema.iter().any(|def| def.accepts(e)))
        .collect()
}

/// Assignable entities not yet placed in any tent and not hidden by the user
pub fn unplaced_entities<'e>(
    entities: &'e [Entity],
    schema: &SlotSchema,
    config: &AppConfig,
) -> Vec<&'e Entity> {
    assignable_entities(entities, schema)
        .into_iter()
        .filter(|e| {
            let id = e.entity_id.as_str();
            !config.hidden_entities.iter().any(|h| h == id)
                && config.tents.iter().all(|t| t.slot_of(id).is_none())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tent_config::{SlotAssignment, TentConfig};

    fn entity(id: &str, device_class: Option<&str>) -> Entity {
        let e = Entity::new(id.parse().unwrap(), "0");
        match device_class {
            Some(dc) => e.with_device_class(dc),
            None => e,
        }
    }

    #[test]
    fn test_temperature_sensor() {
        let schema = SlotSchema::builtin();
        let e = entity("sensor.tent_temp", Some("temperature"));
        let slots: Vec<_> = compatible_slots(&e, schema)
            .iter()
            .map(|m| m.slot_key)
            .collect();
        // reservoir_level carries the wildcard marker
        assert_eq!(slots, vec!["temperature", "reservoir_level"]);
        assert_eq!(suggest_slot(&e, schema).unwrap().slot_key, "temperature");
    }

    #[test]
    fn test_switch_prefers_first_declared_actuator() {
        let schema = SlotSchema::builtin();
        let e = entity("switch.tent_plug", None);
        let matches = compatible_slots(&e, schema);
        assert!(matches.iter().all(|m| m.category == Category::Actuators));
        assert_eq!(matches.first().unwrap().slot_key, "light");
        assert_eq!(matches.len(), 9);
    }

    #[test]
    fn test_fan_domain() {
        let schema = SlotSchema::builtin();
        let e = entity("fan.inline", None);
        let slots: Vec<_> = compatible_slots(&e, schema)
            .iter()
            .map(|m| m.slot_key)
            .collect();
        assert_eq!(slots, vec!["exhaust_fan", "circulation_fan"]);
        assert!(is_compatible(&e, schema, Category::Actuators, "exhaust_fan"));
        assert!(!is_compatible(&e, schema, Category::Actuators, "heater"));
        assert!(!is_compatible(&e, schema, Category::Actuators, "nope"));
    }

    #[test]
    fn test_unmatched_entities_are_not_assignable() {
        let schema = SlotSchema::builtin();
        let entities = vec![
            entity("sensor.phone_battery", Some("battery")),
            entity("media_player.tv", None),
            entity("binary_sensor.tent_leak", Some("moisture")),
        ];
        // battery sensors still fit reservoir_level through the wildcard
        let ids: Vec<_> = assignable_entities(&entities, schema)
            .iter()
            .map(|e| e.entity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["sensor.phone_battery", "binary_sensor.tent_leak"]);
        assert!(suggest_slot(&entities[1], schema).is_none());
    }

    #[test]
    fn test_unplaced_entities() {
        let schema = SlotSchema::builtin();
        let entities = vec![
            entity("fan.a", None),
            entity("fan.b", None),
            entity("fan.c", None),
        ];
        let mut tent = TentConfig::with_id("t1", "Tent");
        tent.actuators
            .insert("exhaust_fan".into(), SlotAssignment::multiple(["fan.a"]));
        let config = AppConfig {
            tents: vec![tent],
            hidden_entities: vec!["fan.c".into()],
            ..Default::default()
        };
        let ids: Vec<_> = unplaced_entities(&entities, schema, &config)
            .iter()
            .map(|e| e.entity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["fan.b"]);
    }
}
