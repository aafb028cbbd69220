//! Versioned JSON persistence for [`AppConfig`]
//!
//! The config lives in `<data_dir>/.storage/tentboard.config` inside a small
//! envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 1,
//!   "key": "tentboard.config",
//!   "data": { "tents": [ ... ] }
//! }
//! ```
//!
//! Saves go to a temp file that is renamed into place, and the previous file
//! is copied to `tentboard.config.backup` first. A bare `AppConfig` document
//! without the envelope (what older builds wrote) is still accepted on load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::tent::AppConfig;

/// Storage key of the dashboard config
pub const STORAGE_KEY: &str = "tentboard.config";
/// Current major version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 1;

/// Envelope written around the stored data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

impl<T> StorageFile<T> {
    pub fn new(key: impl Into<String>, data: T) -> Self {
        Self {
            version: STORAGE_VERSION,
            minor_version: STORAGE_MINOR_VERSION,
            key: key.into(),
            data,
        }
    }
}

/// Loads and saves the dashboard config
#[derive(Debug, Clone)]
pub struct ConfigStore {
    storage_dir: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at `<data_dir>/.storage`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: data_dir.as_ref().join(".storage"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.storage_dir.join(STORAGE_KEY)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.storage_dir.join(format!("{}.backup", STORAGE_KEY))
    }

    /// Load the stored config; `None` when nothing has been saved yet
    pub async fn load(&self) -> ConfigResult<Option<AppConfig>> {
        let path = self.path();
        if !path.exists() {
            debug!("No stored config at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let raw: serde_json::Value = serde_json::from_str(&content)?;

        let envelope_version = raw.get("version").and_then(|v| v.as_u64());
        let config = match (envelope_version, raw.get("data")) {
            (Some(version), Some(_)) => {
                let version = version as u32;
                if version != STORAGE_VERSION {
                    return Err(ConfigError::VersionMismatch {
                        key: STORAGE_KEY.to_string(),
                        expected: STORAGE_VERSION,
                        found: version,
                    });
                }
                let file: StorageFile<AppConfig> = serde_json::from_value(raw)?;
                if file.minor_version > STORAGE_MINOR_VERSION {
                    warn!(
                        "Stored config has newer minor version ({} > {})",
                        file.minor_version, STORAGE_MINOR_VERSION
                    );
                }
                file.data
            }
            _ => {
                info!("Loading unversioned config document");
                serde_json::from_value(raw)?
            }
        };

        info!("Loaded {} tent configurations", config.tents.len());
        Ok(Some(config))
    }

    /// Load the stored config, or an empty one
    pub async fn load_or_default(&self) -> ConfigResult<AppConfig> {
        Ok(self.load().await?.unwrap_or_default())
    }

    /// Save atomically, keeping the previous file as a backup
    pub async fn save(&self, config: &AppConfig) -> ConfigResult<()> {
        if !self.storage_dir.exists() {
            fs::create_dir_all(&self.storage_dir).await?;
            debug!("Created storage directory: {:?}", self.storage_dir);
        }

        let path = self.path();
        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }

        let file = StorageFile::new(STORAGE_KEY, config);
        let content = serde_json::to_string_pretty(&file)?;

        let temp_path = self.storage_dir.join(format!("{}.tmp", STORAGE_KEY));
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(
            tents = config.tents.len(),
            "Saved config (v{}.{})", STORAGE_VERSION, STORAGE_MINOR_VERSION
        );
        Ok(())
    }

    /// Restore the backup over the current file
    pub async fn restore_backup(&self) -> ConfigResult<Option<AppConfig>> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Ok(None);
        }
        fs::copy(&backup, self.path()).await?;
        info!("Restored config from backup");
        self.load().await
    }
}
