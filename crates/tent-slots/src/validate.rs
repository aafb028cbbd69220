//! Tent configuration validation
//!
//! Errors block a save; warnings are shown next to the tent but never
//! stop the user from keeping a partial setup.

use std::collections::HashMap;

use serde::Serialize;
use tent_config::{Category, TentConfig};
use tent_core::Entity;
use tracing::debug;

use crate::schema::SlotSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a tent against the schema and, when given, the entity inventory
///
/// An empty inventory means "not loaded yet" and skips the existence check.
pub fn validate_tent(tent: &TentConfig, schema: &SlotSchema, inventory: &[Entity]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let known: HashMap<&str, &Entity> = inventory
        .iter()
        .map(|e| (e.entity_id.as_str(), e))
        .collect();

    if tent.name.trim().is_empty() {
        report.errors.push("Tent name is empty".to_string());
    }

    for def in schema.required() {
        if !tent.has_entity(def.category, &def.key) {
            report
                .warnings
                .push(format!("Required {} '{}' is not assigned", def.category, def.key));
        }
    }

    let mut seen: HashMap<&str, (Category, &str)> = HashMap::new();
    for (category, slot, entity_id) in tent.all_entities() {
        if let Some((first_category, first_slot)) = seen.insert(entity_id, (category, slot)) {
            report.errors.push(format!(
                "Entity '{}' is assigned to both {}.{} and {}.{}",
                entity_id, first_category, first_slot, category, slot
            ));
        }

        let Some(def) = schema.get(category, slot) else {
            report
                .warnings
                .push(format!("Unknown {} slot '{}'", category, slot));
            continue;
        };

        if known.is_empty() {
            continue;
        }
        match known.get(entity_id) {
            None => report
                .errors
                .push(format!("Entity '{}' not found", entity_id)),
            Some(entity) if !def.accepts(entity) => report.warnings.push(format!(
                "Entity '{}' does not fit slot '{}'",
                entity_id, slot
            )),
            Some(_) => {}
        }
    }

    debug!(
        tent = %tent.id,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Validated tent"
    );
    report
}
