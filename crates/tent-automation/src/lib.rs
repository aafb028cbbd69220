//! Automation chains for the grow-tent dashboard
//!
//! A *chain* is a sensor → threshold → actuator candidate derived from a
//! tent's slot assignments. This crate holds:
//!
//! - [`ChainCatalog`] - the validated static chain table
//! - [`build_chains`] - the derivation engine, a pure function of tent config,
//!   live readings and the registry's missing list
//! - [`AutomationRule`] / [`AutomationRegistry`] - the record shape of real
//!   automations and the registry that owns them
//! - [`missing_suggestions`] / [`detect_conflicts`] - diffs between derivable
//!   chains and existing rules
//! - [`RuleEvaluator`] - hysteresis, cooldown and minimum on/off evaluation
//!
//! # Architecture
//!
//! ```text
//! TentConfig ──┐
//! LiveReadings ├─► build_chains ─► ChainInstance[] (active | missing)
//! MissingChain ┘
//!
//! AutomationRule[] ─► detect_conflicts ─► Conflict[]
//! ```

pub mod catalog;
pub mod chain;
pub mod conflict;
pub mod error;
pub mod eval;
pub mod readings;
pub mod registry;
pub mod rule;
pub mod suggestion;

pub use catalog::{CatalogError, ChainCatalog, ChainCondition, ChainDefinition, ScheduleKeys, VPD};
pub use chain::{
    build_chains, is_derivable, missing_count, resolve_threshold, set_schedule, set_threshold,
    set_threshold_display, ChainInstance, ChainStatus, MissingChain,
};
pub use conflict::{detect_conflicts, Conflict, ConflictKind};
pub use error::{AutomationError, AutomationResult};
pub use eval::{evaluate, Command, Decision, Power, RuleEvaluator, RuleInput, RuleState, RuleStatus};
pub use readings::{live_field, LiveReadings, NoReadings, Readings};
pub use registry::{create_from_chain, AutomationRegistry, InMemoryRegistry, RegisteredRule};
pub use rule::{parse_time, rule_from_chain, AutomationRule, ChainParams, RuleAction, RuleTrigger};
pub use suggestion::{backs_chain, missing_suggestions};
