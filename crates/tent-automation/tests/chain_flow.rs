//! Chains, registry and suggestions working together

use tent_automation::{
    build_chains, create_from_chain, detect_conflicts, missing_count, missing_suggestions,
    AutomationRegistry, ChainCatalog, ChainParams, ChainStatus, InMemoryRegistry, Readings,
};
use tent_config::{Category, SlotAssignment, TentConfig};

fn grow_tent() -> TentConfig {
    let mut tent = TentConfig::with_id("t1", "Flower Room");
    tent.apply_defaults();
    let sensors = tent.slots_mut(Category::Sensors);
    sensors.insert("temperature".into(), SlotAssignment::multiple(["sensor.t1", "sensor.t2"]));
    sensors.insert("humidity".into(), SlotAssignment::single("sensor.rh"));
    let actuators = tent.slots_mut(Category::Actuators);
    actuators.insert("exhaust_fan".into(), SlotAssignment::single("fan.exhaust"));
    actuators.insert("humidifier".into(), SlotAssignment::single("humidifier.main"));
    tent
}

#[tokio::test]
async fn test_creating_a_rule_turns_a_missing_chain_active() {
    let catalog = ChainCatalog::builtin();
    let registry = InMemoryRegistry::new();
    let tent = grow_tent();
    let readings = Readings::default()
        .with_value("avg_temperature", 29.5)
        .with_value("vpd", 1.6)
        .with_actuator("exhaust_fan", "off");

    let rules = registry.list().await.unwrap();
    let missing = missing_suggestions(catalog, std::slice::from_ref(&tent), &rules);
    let chains = build_chains(catalog, &tent, &readings, &missing);

    let ids: Vec<_> = chains.iter().map(|c| c.template_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["high_temp_exhaust", "low_humidity_humidifier", "high_vpd_humidifier"]
    );
    assert_eq!(missing_count(&chains), 3);
    assert_eq!(chains[0].sensor_value, Some(29.5));
    assert_eq!(chains[0].actuator_state.as_deref(), Some("off"));
    assert_eq!(chains[2].sensor_value, Some(1.6));

    create_from_chain(
        &registry,
        catalog,
        &tent,
        "high_temp_exhaust",
        &ChainParams::default(),
    )
    .await
    .unwrap();

    let rules = registry.list().await.unwrap();
    let missing = missing_suggestions(catalog, std::slice::from_ref(&tent), &rules);
    let chains = build_chains(catalog, &tent, &readings, &missing);
    assert_eq!(chains[0].status, ChainStatus::Active);
    assert_eq!(missing_count(&chains), 2);
}

#[tokio::test]
async fn test_two_chains_on_one_humidifier_conflict() {
    let catalog = ChainCatalog::builtin();
    let registry = InMemoryRegistry::new();
    let tent = grow_tent();

    for template in ["low_humidity_humidifier", "high_vpd_humidifier"] {
        create_from_chain(&registry, catalog, &tent, template, &ChainParams::default())
            .await
            .unwrap();
    }

    let rules = registry.list().await.unwrap();
    let conflicts = detect_conflicts(&rules, std::slice::from_ref(&tent));
    // different sensors, same direction: no conflict
    assert!(conflicts.is_empty());

    let mut manual = rules[0].clone();
    manual.id = "rule_manual".into();
    manual.action = tent_automation::RuleAction::TurnOff;
    registry.create(manual).await.unwrap();

    let rules = registry.list().await.unwrap();
    let conflicts = detect_conflicts(&rules, std::slice::from_ref(&tent));
    assert!(!conflicts.is_empty());
    assert!(conflicts.iter().all(|c| c.actuator == "humidifier.main"));
}
