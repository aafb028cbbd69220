//! Grow-tent dashboard
//!
//! Main entry point: loads settings and the tent config, keeps the live
//! session connected and runs the local automation rules until ctrl-c.

mod engine;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tent_assignments::AssignmentStore;
use tent_automation::{
    detect_conflicts, missing_suggestions, AutomationRegistry, ChainCatalog, InMemoryRegistry,
};
use tent_config::{AutoSaver, ConfigStore, Settings};
use tent_live::{session, HttpActionSink, WsChannel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::engine::RuleEngine;

const ENGINE_TICK: Duration = Duration::from_secs(10);

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Log what the dashboard would show in its suggestion panel
async fn report(store: &AssignmentStore, registry: &dyn AutomationRegistry) -> Result<()> {
    let rules = registry.list().await?;
    let tents = store.tents();

    let missing = missing_suggestions(ChainCatalog::builtin(), tents, &rules);
    for chain in &missing {
        info!("Suggested automation: {} for {}", chain.template_id, chain.tent_id);
    }
    for conflict in detect_conflicts(&rules, tents) {
        warn!(
            "Conflicting automations {} and {}: {}",
            conflict.automation1, conflict.automation2, conflict.detail
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref())?;
    init_tracing(&settings.log_level);

    info!("Starting tentboard");

    let config_store = ConfigStore::new(&settings.data_dir);
    let config = config_store.load_or_default().await?;
    info!("Loaded {} tents from {:?}", config.tents.len(), config_store.path());

    let mut assignments = AssignmentStore::new(config);
    assignments.attach_saver(AutoSaver::spawn(config_store, settings.autosave_debounce()));

    let registry = Arc::new(InMemoryRegistry::open(&settings.data_dir).await?);
    info!("Loaded {} automation rules", registry.count());
    report(&assignments, registry.as_ref()).await?;

    let channel = Arc::new(WsChannel::new(
        &settings.live_url,
        settings.access_token.clone(),
    ));
    info!("Live channel: {}", channel.url());
    let mut live = session::start(channel, settings.reconnect_delay());

    let sink = Arc::new(HttpActionSink::new(
        &settings.action_url,
        settings.access_token.clone(),
    )?);
    let engine = RuleEngine::new(registry, live.reconciler().clone(), sink);
    engine.start(ENGINE_TICK);

    info!("tentboard is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    engine.stop();
    live.shutdown().await;
    if let Some(saver) = assignments.detach_saver() {
        saver.flush().await;
    }

    Ok(())
}
