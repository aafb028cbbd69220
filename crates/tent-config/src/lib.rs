//! Tent configuration for the grow-tent dashboard
//!
//! This crate owns the persisted shape of the dashboard:
//!
//! - [`TentConfig`] - one tent's slot assignments, targets, schedules and
//!   control settings
//! - [`SlotAssignment`] - `Empty | Single | Multiple` per slot
//! - [`AppConfig`] - every tent plus UI-level preferences
//! - [`ConfigStore`] / [`AutoSaver`] - versioned JSON persistence with a
//!   debounced writer
//! - [`Settings`] - process settings from YAML and `TENTBOARD_*` variables
//!
//! # Example
//!
//! ```ignore
//! use tent_config::{ConfigStore, TentConfig};
//!
//! let store = ConfigStore::new("./data");
//! let mut config = store.load_or_default().await?;
//! let mut tent = TentConfig::new("Flower Room");
//! tent.apply_defaults();
//! config.tents.push(tent);
//! store.save(&config).await?;
//! ```

mod assignment;
mod autosave;
mod error;
mod settings;
mod storage;
mod tent;

pub use assignment::SlotAssignment;
pub use autosave::AutoSaver;
pub use error::{ConfigError, ConfigResult};
pub use settings::Settings;
pub use storage::{ConfigStore, StorageFile, STORAGE_KEY};
pub use tent::{
    generate_tent_id, AppConfig, Category, ControlSettings, Notifications, Schedules, SlotMap,
    Targets, TentConfig, DEFAULT_SCHEDULES, DEFAULT_TARGETS,
};
