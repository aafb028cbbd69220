//! Entity record supplied by the entity inventory provider

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{EntityId, ATTR_DEVICE_CLASS, ATTR_FRIENDLY_NAME, ATTR_UNIT_OF_MEASUREMENT};

/// An external device or sensor as reported by the platform
///
/// Entities are owned by the platform. The dashboard references them by id
/// and reads `domain`/`device_class` to decide which slots they may fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The entity this record describes
    pub entity_id: EntityId,

    /// Fine-grained sub-type (e.g. `temperature`, `battery`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,

    /// Current state, numeric readings are carried as strings
    pub state: String,

    /// Unit of measurement, if the entity reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

impl Entity {
    pub fn new(entity_id: EntityId, state: impl Into<String>) -> Self {
        Self {
            entity_id,
            device_class: None,
            state: state.into(),
            unit: None,
            friendly_name: None,
        }
    }

    /// Build from a platform state object (`state` plus an attribute map)
    pub fn from_attributes(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: &HashMap<String, serde_json::Value>,
    ) -> Self {
        let text = |key: &str| {
            attributes
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Self {
            entity_id,
            device_class: text(ATTR_DEVICE_CLASS),
            state: state.into(),
            unit: text(ATTR_UNIT_OF_MEASUREMENT),
            friendly_name: text(ATTR_FRIENDLY_NAME),
        }
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// The entity's domain, taken from its id
    pub fn domain(&self) -> &str {
        self.entity_id.domain()
    }

    /// Friendly name, or the raw id when the platform gave none
    pub fn display_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .unwrap_or_else(|| self.entity_id.as_str())
    }

    /// The state parsed as a number, if it is one
    pub fn numeric_state(&self) -> Option<f64> {
        self.state.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == crate::STATE_UNAVAILABLE || self.state == crate::STATE_UNKNOWN
    }
}
