//! Property tests for slot compatibility

use proptest::prelude::*;
use tent_config::Category;
use tent_core::{Entity, EntityId};
use tent_slots::{compatible_slots, suggest_slot, SlotDefinition, SlotSchema};

const DOMAINS: &[&str] = &[
    "sensor",
    "binary_sensor",
    "switch",
    "light",
    "fan",
    "humidifier",
    "climate",
    "camera",
    "media_player",
];

const DEVICE_CLASSES: &[&str] = &[
    "temperature",
    "humidity",
    "carbon_dioxide",
    "illuminance",
    "volume",
    "moisture",
    "power",
    "battery",
];

fn entity_strategy() -> impl Strategy<Value = Entity> {
    (
        prop::sample::select(DOMAINS),
        "[a-z][a-z0-9]{0,8}",
        prop::option::of(prop::sample::select(DEVICE_CLASSES)),
    )
        .prop_map(|(domain, object_id, device_class)| {
            let id = EntityId::new(domain, &object_id).unwrap();
            let entity = Entity::new(id, "0");
            match device_class {
                Some(dc) => entity.with_device_class(dc),
                None => entity,
            }
        })
}

/// Slots drawn from a small domain pool so they overlap often. Device-class
/// lists may be empty, wildcard-only, or mix wildcards with classes.
fn schema_strategy() -> impl Strategy<Value = SlotSchema> {
    let slot = (
        any::<bool>(),
        prop::sample::subsequence(DOMAINS, 1..=3),
        prop::collection::vec(prop::option::of(prop::sample::select(DEVICE_CLASSES)), 0..4),
        any::<bool>(),
    );
    prop::collection::vec(slot, 1..10).prop_map(|slots| {
        let defs = slots
            .into_iter()
            .enumerate()
            .map(|(i, (actuator, domains, classes, multiple))| {
                let category = if actuator {
                    Category::Actuators
                } else {
                    Category::Sensors
                };
                let key = format!("slot_{}", i);
                let def = SlotDefinition::new(category, &key, &key, "", &domains)
                    .device_classes(&classes);
                if multiple {
                    def.multiple()
                } else {
                    def
                }
            })
            .collect();
        SlotSchema::new(defs).unwrap()
    })
}

/// Compatibility restated from the slot rules
fn should_match(def: &SlotDefinition, entity: &Entity) -> bool {
    let domain_ok = def.domains.iter().any(|d| d == entity.domain());
    let class_ok = def.device_classes.is_empty()
        || def.device_classes.iter().any(|c| match c {
            None => true,
            Some(c) => entity.device_class.as_deref() == Some(c.as_str()),
        });
    domain_ok && class_ok
}

fn check_schema(schema: &SlotSchema, entity: &Entity) -> Result<(), TestCaseError> {
    let matches = compatible_slots(entity, schema);

    for def in schema.iter() {
        let listed = matches
            .iter()
            .any(|m| m.category == def.category && m.slot_key == def.key);
        prop_assert_eq!(listed, should_match(def, entity), "slot {}", def.key);
    }

    // declaration order
    let expected: Vec<&str> = schema
        .iter()
        .filter(|def| should_match(def, entity))
        .map(|def| def.key.as_str())
        .collect();
    let keys: Vec<&str> = matches.iter().map(|m| m.slot_key).collect();
    prop_assert_eq!(keys, expected);
    Ok(())
}

proptest! {
    #[test]
    fn compatible_iff_domain_and_class_match(entity in entity_strategy()) {
        check_schema(SlotSchema::builtin(), &entity)?;
    }

    #[test]
    fn compatible_iff_match_in_random_schemas(
        schema in schema_strategy(),
        entity in entity_strategy(),
    ) {
        check_schema(&schema, &entity)?;

        let first = compatible_slots(&entity, &schema).first().map(|m| m.slot_key);
        prop_assert_eq!(suggest_slot(&entity, &schema).map(|m| m.slot_key), first);
    }

    #[test]
    fn suggestion_is_first_compatible(entity in entity_strategy()) {
        let schema = SlotSchema::builtin();
        let first = compatible_slots(&entity, schema).first().map(|m| m.slot_key);
        prop_assert_eq!(suggest_slot(&entity, schema).map(|m| m.slot_key), first);
    }
}
