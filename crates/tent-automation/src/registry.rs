//! Automation registry
//!
//! The dashboard never owns automations; it asks a registry for the list and
//! sends create/update/delete/trigger requests. [`InMemoryRegistry`] is the
//! local implementation, optionally persisted to a JSON file in the same
//! envelope the tent config uses.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tent_config::{StorageFile, TentConfig};
use tokio::fs;
use tracing::{debug, info};

use crate::catalog::ChainCatalog;
use crate::error::{AutomationError, AutomationResult};
use crate::rule::{rule_from_chain, AutomationRule, ChainParams};

/// Storage key of the persisted rule list
pub const RULES_KEY: &str = "tentboard.automation_rules";

/// Source of existing automations and sink for rule edits
#[async_trait]
pub trait AutomationRegistry: Send + Sync {
    /// Every known rule, in creation order
    async fn list(&self) -> AutomationResult<Vec<AutomationRule>>;

    /// Register a new rule and return its id
    async fn create(&self, rule: AutomationRule) -> AutomationResult<String>;

    /// Replace an existing rule
    async fn update(&self, rule: AutomationRule) -> AutomationResult<()>;

    async fn delete(&self, rule_id: &str) -> AutomationResult<AutomationRule>;

    /// Run a rule's action now
    async fn trigger(&self, rule_id: &str) -> AutomationResult<()>;

    async fn set_enabled(&self, rule_id: &str, enabled: bool) -> AutomationResult<()>;
}

/// A rule plus registry bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredRule {
    #[serde(flatten)]
    pub rule: AutomationRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
}

/// Rule registry held in memory
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    rules: DashMap<String, RegisteredRule>,
    path: Option<PathBuf>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a registry persisted at `<data_dir>/.storage/tentboard.automation_rules`
    pub async fn open(data_dir: impl AsRef<Path>) -> AutomationResult<Self> {
        let path = data_dir.as_ref().join(".storage").join(RULES_KEY);
        let registry = Self {
            rules: DashMap::new(),
            path: Some(path.clone()),
        };

        if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let file: StorageFile<Vec<RegisteredRule>> = serde_json::from_str(&content)?;
            for entry in file.data {
                registry.rules.insert(entry.rule.id.clone(), entry);
            }
            info!("Loaded {} automation rules", registry.rules.len());
        }
        Ok(registry)
    }

    pub fn get(&self, rule_id: &str) -> Option<RegisteredRule> {
        self.rules.get(rule_id).map(|r| r.clone())
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Rules belonging to one tent
    pub fn for_tent(&self, tent_id: &str) -> Vec<AutomationRule> {
        self.sorted()
            .into_iter()
            .map(|r| r.rule)
            .filter(|r| r.tent_id == tent_id)
            .collect()
    }

    /// Flip a rule's enabled flag, returning the new value
    pub async fn toggle(&self, rule_id: &str) -> AutomationResult<bool> {
        let enabled = {
            let mut entry = self
                .rules
                .get_mut(rule_id)
                .ok_or_else(|| AutomationError::NotFound(rule_id.to_string()))?;
            entry.rule.enabled = !entry.rule.enabled;
            entry.rule.enabled
        };
        info!(
            "{} automation rule: {}",
            if enabled { "Enabled" } else { "Disabled" },
            rule_id
        );
        self.persist().await?;
        Ok(enabled)
    }

    // ULIDs sort by creation time
    fn sorted(&self) -> Vec<RegisteredRule> {
        let mut rules: Vec<_> = self.rules.iter().map(|r| r.value().clone()).collect();
        rules.sort_by(|a, b| a.rule.id.cmp(&b.rule.id));
        rules
    }

    async fn persist(&self) -> AutomationResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let file = StorageFile::new(RULES_KEY, self.sorted());
        let content = serde_json::to_string_pretty(&file)?;
        let temp = path.with_extension("tmp");
        fs::write(&temp, content).await?;
        fs::rename(&temp, path).await?;
        debug!("Saved {} automation rules to {:?}", self.rules.len(), path);
        Ok(())
    }
}

#[async_trait]
impl AutomationRegistry for InMemoryRegistry {
    async fn list(&self) -> AutomationResult<Vec<AutomationRule>> {
        Ok(self.sorted().into_iter().map(|r| r.rule).collect())
    }

    async fn create(&self, rule: AutomationRule) -> AutomationResult<String> {
        rule.validate()?;
        if self.rules.contains_key(&rule.id) {
            return Err(AutomationError::InvalidConfig(format!(
                "Automation with ID {} already exists",
                rule.id
            )));
        }

        let id = rule.id.clone();
        info!("Added automation rule: {} ({})", rule.name, id);
        self.rules.insert(
            id.clone(),
            RegisteredRule {
                rule,
                last_triggered: None,
            },
        );
        self.persist().await?;
        Ok(id)
    }

    async fn update(&self, rule: AutomationRule) -> AutomationResult<()> {
        rule.validate()?;
        {
            let mut entry = self
                .rules
                .get_mut(&rule.id)
                .ok_or_else(|| AutomationError::NotFound(rule.id.clone()))?;
            debug!("Updated automation rule: {}", rule.id);
            entry.rule = rule;
        }
        self.persist().await
    }

    async fn delete(&self, rule_id: &str) -> AutomationResult<AutomationRule> {
        let (_, removed) = self
            .rules
            .remove(rule_id)
            .ok_or_else(|| AutomationError::NotFound(rule_id.to_string()))?;
        info!("Removed automation rule: {}", removed.rule.name);
        self.persist().await?;
        Ok(removed.rule)
    }

    async fn trigger(&self, rule_id: &str) -> AutomationResult<()> {
        {
            let mut entry = self
                .rules
                .get_mut(rule_id)
                .ok_or_else(|| AutomationError::NotFound(rule_id.to_string()))?;
            entry.last_triggered = Some(Utc::now());
            debug!("Marked automation rule {} as triggered", entry.rule.name);
        }
        self.persist().await
    }

    async fn set_enabled(&self, rule_id: &str, enabled: bool) -> AutomationResult<()> {
        {
            let mut entry = self
                .rules
                .get_mut(rule_id)
                .ok_or_else(|| AutomationError::NotFound(rule_id.to_string()))?;
            entry.rule.enabled = enabled;
        }
        self.persist().await
    }
}

/// Create the rule backing a chain of `tent`
pub async fn create_from_chain(
    registry: &dyn AutomationRegistry,
    catalog: &ChainCatalog,
    tent: &TentConfig,
    template_id: &str,
    params: &ChainParams,
) -> AutomationResult<AutomationRule> {
    let def = catalog
        .get(template_id)
        .ok_or_else(|| AutomationError::UnknownTemplate(template_id.to_string()))?;
    let rule = rule_from_chain(def, tent, params)?;
    registry.create(rule.clone()).await?;
    Ok(rule)
}
