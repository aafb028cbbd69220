//! Provider-side live-state computation
//!
//! Turns a tent's configuration plus the current entity states into the
//! [`TentLiveState`] that is pushed to dashboards: slot readings, averages of
//! multi-entity sensor slots, VPD, the environment score and alerts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tent_config::{Category, TentConfig};
use tent_core::domains::is_on_state;
use tent_core::Entity;
use tracing::trace;

use crate::message::{Alert, Severity};
use crate::state::{ActuatorReading, SensorReading, TentLiveState};

/// Leak-sensor states that count as wet
const LEAK_STATES: &[&str] = &["on", "wet", "detected"];

/// Reservoir level (percent) below which an alert is raised
const RESERVOIR_LOW: f64 = 20.0;

/// Vapour pressure deficit in kPa, rounded to two decimals
///
/// Saturation pressure from the Tetens formula. Returns 0 unless
/// `0 < humidity <= 100`.
pub fn calculate_vpd(temp_c: f64, humidity: f64) -> f64 {
    if humidity <= 0.0 || humidity > 100.0 {
        return 0.0;
    }
    let svp = 0.6108 * ((17.27 * temp_c) / (temp_c + 237.3)).exp();
    let vpd = svp * (1.0 - humidity / 100.0);
    (vpd * 100.0).round() / 100.0
}

fn band_score(value: f64, min: f64, max: f64, per_unit: f64) -> f64 {
    let deviation = if value < min {
        min - value
    } else if value > max {
        value - max
    } else {
        return 100.0;
    };
    (100.0 - deviation * per_unit).max(0.0)
}

/// Environment score 0-100: mean of the temperature, humidity and VPD scores
/// that can be computed
pub fn environment_score(
    temperature: Option<f64>,
    humidity: Option<f64>,
    vpd: Option<f64>,
    tent: &TentConfig,
) -> u8 {
    let target = |key: &str, fallback: f64| tent.target(key).unwrap_or(fallback);
    let mut scores = Vec::with_capacity(3);

    if let Some(t) = temperature {
        scores.push(band_score(
            t,
            target("temp_day_min", 18.0),
            target("temp_day_max", 28.0),
            10.0,
        ));
    }
    if let Some(h) = humidity {
        scores.push(band_score(
            h,
            target("humidity_day_min", 40.0),
            target("humidity_day_max", 70.0),
            2.0,
        ));
    }
    if let Some(v) = vpd {
        scores.push(if (0.8..=1.2).contains(&v) {
            100.0
        } else if (0.4..=1.6).contains(&v) {
            75.0
        } else {
            50.0
        });
    }

    if scores.is_empty() {
        return 0;
    }
    (scores.iter().sum::<f64>() / scores.len() as f64) as u8
}

/// Alerts for the current readings, honouring the tent's notification switches
pub fn check_alerts(state: &TentLiveState, tent: &TentConfig) -> Vec<Alert> {
    let notify = &tent.notifications;
    let mut alerts = Vec::new();
    if !notify.enabled {
        return alerts;
    }
    let target = |key: &str, fallback: f64| tent.target(key).unwrap_or(fallback);

    if let Some(t) = state.temperature().filter(|_| notify.alert_temp_out_of_range) {
        let (min, max) = (target("temp_day_min", 18.0), target("temp_day_max", 30.0));
        if t < min || t > max {
            alerts.push(Alert::new(
                "temp_out_of_range",
                Severity::Warning,
                format!("Temperature {}°C is outside range ({}-{}°C)", t, min, max),
            ));
        }
    }

    if let Some(h) = state.humidity().filter(|_| notify.alert_humidity_out_of_range) {
        let (min, max) = (target("humidity_day_min", 40.0), target("humidity_day_max", 70.0));
        if h < min || h > max {
            alerts.push(Alert::new(
                "humidity_out_of_range",
                Severity::Warning,
                format!("Humidity {}% is outside range ({}-{}%)", h, min, max),
            ));
        }
    }

    let leak = state
        .sensors
        .get("leak_sensor")
        .map(|r| match &r.value {
            serde_json::Value::Bool(wet) => *wet,
            other => other.as_str().is_some_and(|s| LEAK_STATES.contains(&s)),
        })
        .unwrap_or(false);
    if leak && notify.alert_leak_detected {
        alerts.push(Alert::new(
            "leak_detected",
            Severity::Critical,
            "Water leak detected!",
        ));
    }

    if let Some(level) = state
        .sensors
        .get("reservoir_level")
        .and_then(SensorReading::number)
        .filter(|_| notify.alert_reservoir_low)
    {
        if level < RESERVOIR_LOW {
            alerts.push(Alert::new(
                "reservoir_low",
                Severity::Warning,
                format!("Reservoir level low ({}%)", level),
            ));
        }
    }

    alerts
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Builds [`TentLiveState`] from entity states
pub struct LiveStateBuilder<'a> {
    entities: HashMap<&'a str, &'a Entity>,
}

impl<'a> LiveStateBuilder<'a> {
    pub fn new(entities: &'a [Entity]) -> Self {
        Self {
            entities: entities
                .iter()
                .map(|e| (e.entity_id.as_str(), e))
                .collect(),
        }
    }

    fn available(&self, ids: &'a [String]) -> Vec<&'a Entity> {
        ids.iter()
            .filter_map(|id| self.entities.get(id.as_str()).copied())
            .filter(|e| !e.is_unavailable())
            .collect()
    }

    fn sensor(&self, ids: &'a [String]) -> Option<SensorReading> {
        let entities = self.available(ids);
        let first = entities.first()?;
        let numbers: Vec<f64> = entities.iter().filter_map(|e| e.numeric_state()).collect();

        let value = match mean(&numbers) {
            Some(avg) if entities.len() > 1 => serde_json::Value::from(avg),
            Some(n) => serde_json::Value::from(n),
            None => serde_json::Value::from(first.state.clone()),
        };
        Some(SensorReading {
            value,
            unit: first.unit.clone(),
            updated: None,
        })
    }

    fn actuator(&self, ids: &'a [String]) -> Option<ActuatorReading> {
        let entities = self.available(ids);
        let shown = entities
            .iter()
            .find(|e| is_on_state(&e.state))
            .or_else(|| entities.first())?;
        Some(ActuatorReading::new(shown.state.clone()))
    }

    /// Live state of one tent at `now`
    pub fn build(&self, tent: &'a TentConfig, now: DateTime<Utc>) -> TentLiveState {
        let mut state = TentLiveState::new(tent.id.clone(), tent.name.clone());

        for (slot, assignment) in tent.slots(Category::Sensors) {
            if let Some(mut reading) = self.sensor(assignment.ids()) {
                reading.updated = Some(now);
                state.sensors.insert(slot.clone(), reading);
            }
        }
        for (slot, assignment) in tent.slots(Category::Actuators) {
            if let Some(mut reading) = self.actuator(assignment.ids()) {
                reading.updated = Some(now);
                state.actuators.insert(slot.clone(), reading);
            }
        }

        let average = |slot: &str| {
            let numbers: Vec<f64> = self
                .available(tent.assignment(Category::Sensors, slot).ids())
                .iter()
                .filter_map(|e| e.numeric_state())
                .collect();
            mean(&numbers)
        };
        state.avg_temperature = average("temperature");
        state.avg_humidity = average("humidity");

        state.vpd = match (state.avg_temperature, state.avg_humidity) {
            (Some(t), Some(h)) => Some(calculate_vpd(t, h)),
            _ => None,
        };
        state.environment_score =
            environment_score(state.avg_temperature, state.avg_humidity, state.vpd, tent);
        state.alerts = check_alerts(&state, tent);
        state.last_updated = Some(now);

        trace!(
            tent = %tent.id,
            score = state.environment_score,
            alerts = state.alerts.len(),
            "Built live state"
        );
        state
    }

    /// Live state of every tent
    pub fn build_all(&self, tents: &'a [TentConfig], now: DateTime<Utc>) -> Vec<TentLiveState> {
        tents.iter().map(|t| self.build(t, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tent_config::SlotAssignment;
    use tent_core::EntityId;

    fn entity(id: &str, state: &str) -> Entity {
        let (domain, object) = id.split_once('.').unwrap();
        Entity::new(EntityId::new(domain, object).unwrap(), state)
    }

    fn tent() -> TentConfig {
        let mut tent = TentConfig::with_id("t1", "Tent 1");
        tent.apply_defaults();
        let sensors = tent.slots_mut(Category::Sensors);
        sensors.insert(
            "temperature".into(),
            SlotAssignment::multiple(["sensor.top", "sensor.bottom"]),
        );
        sensors.insert("humidity".into(), SlotAssignment::single("sensor.rh"));
        sensors.insert("leak_sensor".into(), SlotAssignment::single("binary_sensor.leak"));
        tent.slots_mut(Category::Actuators).insert(
            "exhaust_fan".into(),
            SlotAssignment::multiple(["fan.a", "fan.b"]),
        );
        tent
    }

    #[test]
    fn test_vpd() {
        assert_eq!(calculate_vpd(25.0, 60.0), 1.27);
        assert_eq!(calculate_vpd(25.0, 0.0), 0.0);
        assert_eq!(calculate_vpd(25.0, 101.0), 0.0);
        assert_eq!(calculate_vpd(25.0, 100.0), 0.0);
    }

    #[test]
    fn test_environment_score() {
        let tent = tent();
        assert_eq!(environment_score(Some(25.0), Some(60.0), Some(1.27), &tent), 91);
        assert_eq!(environment_score(None, None, None, &tent), 0);
        // 3 degrees over: 70; humidity 20 under: 60
        assert_eq!(environment_score(Some(31.0), Some(30.0), None, &tent), 65);
    }

    #[test]
    fn test_build_averages_and_alerts() {
        let entities = vec![
            entity("sensor.top", "26"),
            entity("sensor.bottom", "24"),
            entity("sensor.rh", "60"),
            entity("binary_sensor.leak", "on"),
            entity("fan.a", "off"),
            entity("fan.b", "on"),
        ];
        let tent = tent();
        let now = Utc::now();
        let state = LiveStateBuilder::new(&entities).build(&tent, now);

        assert_eq!(state.avg_temperature, Some(25.0));
        assert_eq!(state.avg_humidity, Some(60.0));
        assert_eq!(state.vpd, Some(1.27));
        assert_eq!(state.actuators["exhaust_fan"].state, "on");
        assert_eq!(state.sensors["leak_sensor"].text(), Some("on"));
        assert_eq!(state.environment_score, 91);
        assert_eq!(state.last_updated, Some(now));

        let kinds: Vec<_> = state.alerts.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["leak_detected"]);
        assert_eq!(state.alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_alert_switches_and_reservoir() {
        let mut tent = tent();
        let state = TentLiveState::new("t1", "Tent 1")
            .with_sensor("temperature", 35.0)
            .with_sensor("reservoir_level", "12");

        let kinds: Vec<_> = check_alerts(&state, &tent)
            .into_iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(kinds, vec!["temp_out_of_range", "reservoir_low"]);

        tent.notifications.alert_temp_out_of_range = false;
        assert_eq!(check_alerts(&state, &tent).len(), 1);
        tent.notifications.enabled = false;
        assert!(check_alerts(&state, &tent).is_empty());
    }

    #[test]
    fn test_unavailable_entities_skipped() {
        let entities = vec![entity("sensor.top", "unavailable"), entity("sensor.bottom", "22")];
        let state = LiveStateBuilder::new(&entities).build(&tent(), Utc::now());
        assert_eq!(state.avg_temperature, Some(22.0));
        assert!(state.vpd.is_none());
        assert!(!state.actuators.contains_key("exhaust_fan"));
    }
}
