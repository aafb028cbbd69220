//! Core types for the tent dashboard
//!
//! This crate provides the fundamental types shared by every other crate in
//! the workspace: the validated [`EntityId`], the [`Entity`] record supplied
//! by the home-automation platform, and domain metadata.

pub mod domains;
mod entity;
mod entity_id;
mod units;

pub use entity::Entity;
pub use entity_id::{EntityId, EntityIdError};
pub use units::TemperatureUnit;

/// Attribute key carrying an entity's device class
pub const ATTR_DEVICE_CLASS: &str = "device_class";

/// Attribute key carrying an entity's unit of measurement
pub const ATTR_UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";

/// Attribute key carrying an entity's display name
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

/// State value reported by unavailable entities
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value reported when the platform has no reading yet
pub const STATE_UNKNOWN: &str = "unknown";
