//! Assignment store
//!
//! Owns the [`AppConfig`] and applies every slot edit. A tent is never edited
//! in place: the operation works on a clone and the clone replaces the stored
//! tent only when the whole operation succeeded.

use std::sync::Arc;

use tent_config::{generate_tent_id, AppConfig, AutoSaver, Category, SlotAssignment, TentConfig};
use tent_core::Entity;
use tent_slots::SlotSchema;
use tracing::{debug, info, instrument};

use crate::error::{AssignmentError, AssignmentResult};

/// Where an entity is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement<'a> {
    pub tent_id: &'a str,
    pub category: Category,
    pub slot: &'a str,
}

/// Per-tent slot assignments
pub struct AssignmentStore {
    config: AppConfig,
    schema: Arc<SlotSchema>,
    saver: Option<AutoSaver>,
}

impl AssignmentStore {
    /// Wrap a loaded config using the built-in slot schema
    pub fn new(config: AppConfig) -> Self {
        Self::with_schema(config, Arc::new(SlotSchema::builtin().clone()))
    }

    pub fn with_schema(mut config: AppConfig, schema: Arc<SlotSchema>) -> Self {
        for tent in &mut config.tents {
            drop_empty_slots(tent);
        }
        Self {
            config,
            schema,
            saver: None,
        }
    }

    /// Hand every successful edit to an auto-saver
    pub fn attach_saver(&mut self, saver: AutoSaver) {
        self.saver = Some(saver);
    }

    /// Detach the auto-saver, e.g. to flush it on shutdown
    pub fn detach_saver(&mut self) -> Option<AutoSaver> {
        self.saver.take()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    pub fn tents(&self) -> &[TentConfig] {
        &self.config.tents
    }

    pub fn tent(&self, tent_id: &str) -> Option<&TentConfig> {
        self.config.tent(tent_id)
    }

    pub fn contains_tent(&self, tent_id: &str) -> bool {
        self.config.tent_index(tent_id).is_some()
    }

    /// Whether the slot holds at least one entity; unknown tents hold nothing
    pub fn has_entity(&self, tent_id: &str, category: Category, slot: &str) -> bool {
        self.tent(tent_id)
            .map(|t| t.has_entity(category, slot))
            .unwrap_or(false)
    }

    /// Find the first tent and slot holding an entity
    pub fn locate(&self, entity_id: &str) -> Option<Placement<'_>> {
        self.config.tents.iter().find_map(|tent| {
            tent.slot_of(entity_id).map(|(category, slot)| Placement {
                tent_id: tent.id.as_str(),
                category,
                slot,
            })
        })
    }

    /// Assign an entity to a slot
    ///
    /// Single slots are overwritten; multiple slots append unless the entity
    /// is already there. The entity leaves any other slot of the same tent.
    /// Compatibility is not checked here, see [`Self::assign_checked`].
    /// Returns whether anything changed.
    #[instrument(skip(self))]
    pub fn assign(
        &mut self,
        tent_id: &str,
        category: Category,
        slot: &str,
        entity_id: &str,
    ) -> AssignmentResult<bool> {
        let changed = self.update(tent_id, |tent, schema| {
            let multiple = schema.is_multiple(category, slot);
            Ok(place(tent, multiple, category, slot, entity_id))
        })?;
        debug!(changed, "Assigned entity");
        Ok(changed)
    }

    /// Assign after checking the entity fits the slot
    pub fn assign_checked(
        &mut self,
        tent_id: &str,
        category: Category,
        slot: &str,
        entity: &Entity,
    ) -> AssignmentResult<bool> {
        let def = self
            .schema
            .get(category, slot)
            .ok_or_else(|| AssignmentError::UnknownSlot {
                category,
                slot: slot.to_string(),
            })?;
        if !def.accepts(entity) {
            return Err(AssignmentError::Incompatible {
                entity_id: entity.entity_id.to_string(),
                category,
                slot: slot.to_string(),
            });
        }
        self.assign(tent_id, category, slot, entity.entity_id.as_str())
    }

    /// Assign several entities in the given order
    ///
    /// Entities already in the slot are skipped. On a single slot each entity
    /// replaces the previous one, so the last wins. Returns how many entities
    /// were placed.
    #[instrument(skip(self, entity_ids))]
    pub fn bulk_assign<I, S>(
        &mut self,
        tent_id: &str,
        category: Category,
        slot: &str,
        entity_ids: I,
    ) -> AssignmentResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = entity_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let placed = self.update(tent_id, |tent, schema| {
            let multiple = schema.is_multiple(category, slot);
            Ok(ids
                .iter()
                .filter(|id| place(tent, multiple, category, slot, id.as_str()))
                .count())
        })?;
        debug!(placed, requested = ids.len(), "Bulk assigned entities");
        Ok(placed)
    }

    /// Remove one entity by position, or the whole slot when `index` is `None`
    ///
    /// A slot left with no entities is removed from the map. Returns the
    /// removed entity ids.
    #[instrument(skip(self))]
    pub fn unassign(
        &mut self,
        tent_id: &str,
        category: Category,
        slot: &str,
        index: Option<usize>,
    ) -> AssignmentResult<Vec<String>> {
        let removed = self.update(tent_id, |tent, _| {
            let slots = tent.slots_mut(category);
            let mut ids = slots
                .get(slot)
                .filter(|a| !a.is_empty())
                .map(|a| a.ids().to_vec())
                .ok_or_else(|| AssignmentError::SlotNotFound {
                    tent_id: tent_id.to_string(),
                    category,
                    slot: slot.to_string(),
                })?;

            let removed = match index {
                None => std::mem::take(&mut ids),
                Some(i) if i < ids.len() => vec![ids.remove(i)],
                Some(i) => {
                    return Err(AssignmentError::IndexOutOfRange {
                        category,
                        slot: slot.to_string(),
                        index: i,
                        len: ids.len(),
                    })
                }
            };

            if ids.is_empty() {
                slots.shift_remove(slot);
            } else {
                slots.insert(slot.to_string(), SlotAssignment::multiple(ids));
            }
            Ok(removed)
        })?;
        debug!(removed = removed.len(), "Unassigned entities");
        Ok(removed)
    }

    /// Remove an entity from whichever slot holds it in a tent
    pub fn unassign_entity(&mut self, tent_id: &str, entity_id: &str) -> AssignmentResult<bool> {
        self.update(tent_id, |tent, _| Ok(detach(tent, entity_id, None)))
    }

    /// Store an explicit actuator display order
    ///
    /// Blank and repeated keys are dropped. See [`effective_order`] for how
    /// the stored order is merged with the assigned slots.
    #[instrument(skip(self, order))]
    pub fn reorder<I, S>(&mut self, tent_id: &str, order: I) -> AssignmentResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = Vec::new();
        for key in order {
            let key = key.into();
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        self.update(tent_id, move |tent, _| {
            tent.control_settings.order = keys;
            Ok(())
        })
    }

    /// Display order of a tent's assigned actuator slots
    pub fn effective_order(&self, tent_id: &str) -> AssignmentResult<Vec<&str>> {
        self.tent(tent_id)
            .map(effective_order)
            .ok_or_else(|| AssignmentError::TentNotFound(tent_id.to_string()))
    }

    /// Create an empty tent with default targets and schedules
    #[instrument(skip(self))]
    pub fn create_tent(&mut self, name: &str) -> String {
        let mut tent = TentConfig::new(name);
        while self.contains_tent(&tent.id) {
            tent.id = generate_tent_id();
        }
        tent.apply_defaults();
        let id = tent.id.clone();
        self.config.tents.push(tent);
        info!(tent = %id, "Created tent");
        self.changed();
        id
    }

    #[instrument(skip(self))]
    pub fn delete_tent(&mut self, tent_id: &str) -> AssignmentResult<TentConfig> {
        let index = self
            .config
            .tent_index(tent_id)
            .ok_or_else(|| AssignmentError::TentNotFound(tent_id.to_string()))?;
        let tent = self.config.tents.remove(index);
        info!(name = %tent.name, "Deleted tent");
        self.changed();
        Ok(tent)
    }

    /// Edit a tent's other fields (name, targets, schedules, ...)
    ///
    /// Slots emptied by the closure are removed afterwards.
    pub fn update_tent<F>(&mut self, tent_id: &str, f: F) -> AssignmentResult<()>
    where
        F: FnOnce(&mut TentConfig),
    {
        self.update(tent_id, |tent, _| {
            let id = tent.id.clone();
            f(tent);
            tent.id = id;
            drop_empty_slots(tent);
            Ok(())
        })
    }

    /// Hide or show an entity in inventory listings
    pub fn set_hidden(&mut self, entity_id: &str, hidden: bool) {
        let list = &mut self.config.hidden_entities;
        let present = list.iter().any(|id| id == entity_id);
        match (hidden, present) {
            (true, false) => list.push(entity_id.to_string()),
            (false, true) => list.retain(|id| id != entity_id),
            _ => return,
        }
        self.changed();
    }

    /// Set or clear a display-name override
    pub fn set_custom_name(&mut self, entity_id: &str, name: Option<&str>) {
        match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => {
                self.config
                    .custom_names
                    .insert(entity_id.to_string(), name.to_string());
            }
            None => {
                self.config.custom_names.shift_remove(entity_id);
            }
        }
        self.changed();
    }

    /// Replace the tent with an edited clone once `f` succeeds
    fn update<F, T>(&mut self, tent_id: &str, f: F) -> AssignmentResult<T>
    where
        F: FnOnce(&mut TentConfig, &SlotSchema) -> AssignmentResult<T>,
    {
        let index = self
            .config
            .tent_index(tent_id)
            .ok_or_else(|| AssignmentError::TentNotFound(tent_id.to_string()))?;

        let mut tent = self.config.tents[index].clone();
        let out = f(&mut tent, self.schema.as_ref())?;
        if tent != self.config.tents[index] {
            self.config.tents[index] = tent;
            self.changed();
        }
        Ok(out)
    }

    fn changed(&self) {
        if let Some(saver) = &self.saver {
            saver.schedule(self.config.clone());
        }
    }
}

/// Stored order entries that still have an assignment, then every other
/// assigned actuator slot in map order
pub fn effective_order(tent: &TentConfig) -> Vec<&str> {
    let assigned: Vec<&str> = tent
        .actuators
        .iter()
        .filter(|(_, a)| !a.is_empty())
        .map(|(key, _)| key.as_str())
        .collect();

    let mut order: Vec<&str> = Vec::with_capacity(assigned.len());
    let explicit = tent.control_settings.order.iter().map(String::as_str);
    for key in explicit.chain(assigned.iter().copied()) {
        if assigned.contains(&key) && !order.contains(&key) {
            order.push(key);
        }
    }
    order
}

fn place(tent: &mut TentConfig, multiple: bool, category: Category, slot: &str, entity_id: &str) -> bool {
    if entity_id.is_empty() {
        return false;
    }
    let detached = detach(tent, entity_id, Some((category, slot)));

    let slots = tent.slots_mut(category);
    let current = slots.get(slot).cloned().unwrap_or_default();
    let next = if multiple {
        if current.contains(entity_id) {
            return detached;
        }
        SlotAssignment::multiple(
            current
                .ids()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(entity_id)),
        )
    } else {
        SlotAssignment::single(entity_id)
    };

    let placed = next != current;
    slots.insert(slot.to_string(), next);
    detached || placed
}

/// Remove an entity from every slot of the tent except `keep`
fn detach(tent: &mut TentConfig, entity_id: &str, keep: Option<(Category, &str)>) -> bool {
    let mut removed = false;
    for category in Category::ALL {
        for (slot, assignment) in tent.slots_mut(category).iter_mut() {
            if keep == Some((category, slot.as_str())) || !assignment.contains(entity_id) {
                continue;
            }
            *assignment = SlotAssignment::multiple(
                assignment
                    .ids()
                    .iter()
                    .filter(|id| id.as_str() != entity_id)
                    .cloned(),
            );
            removed = true;
        }
    }
    if removed {
        drop_empty_slots(tent);
    }
    removed
}

fn drop_empty_slots(tent: &mut TentConfig) {
    for category in Category::ALL {
        tent.slots_mut(category).retain(|_, a| !a.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tent_config::Category::{Actuators, Sensors};

    fn store() -> (AssignmentStore, String) {
        let mut store = AssignmentStore::new(AppConfig::default());
        let id = store.create_tent("Tent 1");
        (store, id)
    }

    #[test]
    fn test_single_slot_overwrites() {
        let (mut store, t) = store();
        assert!(store.assign(&t, Actuators, "heater", "switch.a").unwrap());
        assert!(store.assign(&t, Actuators, "heater", "switch.b").unwrap());
        assert_eq!(
            store.tent(&t).unwrap().actuators["heater"],
            SlotAssignment::Single("switch.b".into())
        );
    }

    #[test]
    fn test_single_slot_idempotent() {
        let (mut store, t) = store();
        store.assign(&t, Actuators, "heater", "switch.a").unwrap();
        assert!(!store.assign(&t, Actuators, "heater", "switch.a").unwrap());
        assert_eq!(store.tent(&t).unwrap().actuators["heater"].len(), 1);
    }

    #[test]
    fn test_multiple_slot_set_semantics() {
        let (mut store, t) = store();
        store.assign(&t, Actuators, "exhaust_fan", "fan.a").unwrap();
        store.assign(&t, Actuators, "exhaust_fan", "fan.b").unwrap();
        assert!(!store.assign(&t, Actuators, "exhaust_fan", "fan.a").unwrap());
        assert_eq!(
            store.tent(&t).unwrap().actuators["exhaust_fan"].ids(),
            &["fan.a".to_string(), "fan.b".to_string()]
        );
    }

    #[test]
    fn test_assign_moves_entity_within_tent() {
        let (mut store, t) = store();
        store.assign(&t, Actuators, "exhaust_fan", "fan.a").unwrap();
        store.assign(&t, Actuators, "circulation_fan", "fan.a").unwrap();

        let tent = store.tent(&t).unwrap();
        assert!(!tent.actuators.contains_key("exhaust_fan"));
        assert_eq!(tent.slot_of("fan.a"), Some((Actuators, "circulation_fan")));
    }

    #[test]
    fn test_bulk_assign_keeps_order() {
        let (mut store, t) = store();
        store.assign(&t, Sensors, "temperature", "sensor.b").unwrap();
        let placed = store
            .bulk_assign(&t, Sensors, "temperature", ["sensor.c", "sensor.b", "sensor.a", "sensor.c"])
            .unwrap();
        assert_eq!(placed, 2);
        assert_eq!(
            store.tent(&t).unwrap().sensors["temperature"].ids(),
            &["sensor.b", "sensor.c", "sensor.a"].map(String::from)
        );
    }

    #[test]
    fn test_unassign_by_index() {
        let (mut store, t) = store();
        store
            .bulk_assign(&t, Actuators, "light", ["light.a", "light.b"])
            .unwrap();
        assert_eq!(
            store.unassign(&t, Actuators, "light", Some(0)).unwrap(),
            vec!["light.a"]
        );
        assert!(store.has_entity(&t, Actuators, "light"));
        assert_eq!(
            store.unassign(&t, Actuators, "light", Some(0)).unwrap(),
            vec!["light.b"]
        );
        assert!(!store.has_entity(&t, Actuators, "light"));
        assert!(!store.tent(&t).unwrap().actuators.contains_key("light"));
    }

    #[test]
    fn test_unassign_errors_leave_store_untouched() {
        let (mut store, t) = store();
        store.assign(&t, Actuators, "light", "light.a").unwrap();
        let before = store.config().clone();

        assert!(matches!(
            store.unassign(&t, Actuators, "light", Some(3)),
            Err(AssignmentError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
        assert!(matches!(
            store.unassign(&t, Actuators, "heater", None),
            Err(AssignmentError::SlotNotFound { .. })
        ));
        assert_eq!(store.config(), &before);
    }

    #[test]
    fn test_unknown_tent() {
        let (mut store, _) = store();
        assert_eq!(
            store.assign("nope", Actuators, "light", "light.a"),
            Err(AssignmentError::TentNotFound("nope".into()))
        );
        assert!(!store.has_entity("nope", Actuators, "light"));
        assert!(store.effective_order("nope").is_err());
        assert!(store.delete_tent("nope").is_err());
    }

    #[test]
    fn test_assign_checked() {
        let (mut store, t) = store();
        let spare = Entity::new("sensor.spare".parse().unwrap(), "21").with_device_class("humidity");

        assert!(matches!(
            store.assign_checked(&t, Sensors, "temperature", &spare),
            Err(AssignmentError::Incompatible { .. })
        ));
        assert!(matches!(
            store.assign_checked(&t, Sensors, "soil", &spare),
            Err(AssignmentError::UnknownSlot { .. })
        ));
        assert!(store.assign_checked(&t, Sensors, "humidity", &spare).unwrap());
    }

    #[test]
    fn test_effective_order() {
        let (mut store, t) = store();
        for (slot, id) in [
            ("light", "light.a"),
            ("exhaust_fan", "fan.a"),
            ("heater", "switch.h"),
            ("humidifier", "switch.hum"),
        ] {
            store.assign(&t, Actuators, slot, id).unwrap();
        }
        store
            .reorder(&t, ["heater", "ac", "light", "heater"])
            .unwrap();

        assert_eq!(
            store.tent(&t).unwrap().control_settings.order,
            vec!["heater", "ac", "light"]
        );
        // "ac" has nothing assigned and is skipped
        assert_eq!(
            store.effective_order(&t).unwrap(),
            vec!["heater", "light", "exhaust_fan", "humidifier"]
        );
        // stable across calls
        assert_eq!(
            store.effective_order(&t).unwrap(),
            store.effective_order(&t).unwrap()
        );
    }

    #[test]
    fn test_create_and_delete_tent() {
        let (mut store, t) = store();
        let tent = store.tent(&t).unwrap();
        assert_eq!(tent.target("temp_day_max"), Some(28.0));

        let second = store.create_tent("Tent 2");
        assert_ne!(t, second);
        assert_eq!(store.delete_tent(&t).unwrap().name, "Tent 1");
        assert_eq!(store.tents().len(), 1);
        assert_eq!(store.tents()[0].id, second);
    }

    #[test]
    fn test_locate_and_unassign_entity() {
        let (mut store, t) = store();
        store.assign(&t, Sensors, "temperature", "sensor.t").unwrap();
        assert_eq!(
            store.locate("sensor.t"),
            Some(Placement {
                tent_id: t.as_str(),
                category: Sensors,
                slot: "temperature"
            })
        );
        assert!(store.unassign_entity(&t, "sensor.t").unwrap());
        assert!(store.locate("sensor.t").is_none());
        assert!(!store.tent(&t).unwrap().sensors.contains_key("temperature"));
    }

    #[test]
    fn test_update_tent_keeps_id_and_drops_empty_slots() {
        let (mut store, t) = store();
        store
            .update_tent(&t, |tent| {
                tent.id = "hijacked".into();
                tent.name = "Veg".into();
                tent.targets.insert("temp_day_max".into(), 30.0);
                tent.sensors.insert("co2".into(), SlotAssignment::Empty);
            })
            .unwrap();
        let tent = store.tent(&t).unwrap();
        assert_eq!(tent.name, "Veg");
        assert_eq!(tent.target("temp_day_max"), Some(30.0));
        assert!(!tent.sensors.contains_key("co2"));
    }

    #[test]
    fn test_loaded_empty_slots_are_dropped() {
        let mut tent = TentConfig::with_id("t1", "Tent 1");
        tent.sensors.insert("co2".into(), SlotAssignment::Empty);
        let store = AssignmentStore::new(AppConfig {
            tents: vec![tent],
            ..Default::default()
        });
        assert!(store.tent("t1").unwrap().sensors.is_empty());
    }

    #[test]
    fn test_hidden_and_custom_names() {
        let (mut store, _) = store();
        store.set_hidden("sensor.x", true);
        store.set_hidden("sensor.x", true);
        assert_eq!(store.config().hidden_entities, vec!["sensor.x"]);
        store.set_hidden("sensor.x", false);
        assert!(store.config().hidden_entities.is_empty());

        store.set_custom_name("sensor.x", Some("Canopy sensor"));
        assert_eq!(store.config().custom_names["sensor.x"], "Canopy sensor");
        store.set_custom_name("sensor.x", Some("  "));
        assert!(store.config().custom_names.is_empty());
    }
}
