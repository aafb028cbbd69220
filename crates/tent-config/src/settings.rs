//! Process settings
//!
//! Settings come from an optional `tentboard.yaml` and are then overridden by
//! `TENTBOARD_*` environment variables. Nothing here is persisted by the
//! dashboard itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tent_core::TemperatureUnit;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Runtime settings for the dashboard process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// WebSocket URL of the live-state channel
    pub live_url: String,

    /// Base URL of the action/command endpoint
    pub action_url: String,

    /// Bearer token for both endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Directory holding `.storage/`
    pub data_dir: PathBuf,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay_ms: u64,

    /// Quiet period before an edited config is written
    pub autosave_debounce_ms: u64,

    /// Preferred display unit for temperatures
    pub temperature_unit: TemperatureUnit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            live_url: "ws://localhost:8099/ws".to_string(),
            action_url: "http://localhost:8099/api".to_string(),
            access_token: None,
            data_dir: PathBuf::from("./data"),
            reconnect_delay_ms: 3_000,
            autosave_debounce_ms: 1_000,
            temperature_unit: TemperatureUnit::Celsius,
        }
    }
}

impl Settings {
    /// Load settings from an optional YAML file, then apply process env overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse a YAML settings file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        debug!("Loading settings file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TENTBOARD_*` overrides using the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TENTBOARD_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("TENTBOARD_LIVE_URL") {
            self.live_url = v;
        }
        if let Some(v) = lookup("TENTBOARD_ACTION_URL") {
            self.action_url = v;
        }
        if let Some(v) = lookup("TENTBOARD_TOKEN").or_else(|| lookup("SUPERVISOR_TOKEN")) {
            self.access_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("TENTBOARD_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TENTBOARD_RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = parse_millis("TENTBOARD_RECONNECT_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("TENTBOARD_AUTOSAVE_DEBOUNCE_MS") {
            self.autosave_debounce_ms = parse_millis("TENTBOARD_AUTOSAVE_DEBOUNCE_MS", &v)?;
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

fn parse_millis(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected milliseconds, got '{}'", value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(settings.autosave_debounce(), Duration::from_secs(1));
        assert_eq!(settings.temperature_unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tentboard.yaml");
        std::fs::write(
            &path,
            "live_url: ws://garden.local/ws\ntemperature_unit: fahrenheit\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.live_url, "ws://garden.local/ws");
        assert_eq!(settings.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tentboard.yaml");
        std::fs::write(&path, "reconnect_delay_ms: [not, a, number]\n").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TENTBOARD_LOG_LEVEL", "debug"),
            ("SUPERVISOR_TOKEN", "abc"),
            ("TENTBOARD_RECONNECT_DELAY_MS", "500"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.access_token.as_deref(), Some("abc"));
        assert_eq!(settings.reconnect_delay_ms, 500);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|k| (k == "TENTBOARD_AUTOSAVE_DEBOUNCE_MS").then(|| "soon".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
