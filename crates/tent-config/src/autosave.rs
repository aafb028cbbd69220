//! Debounced auto-save
//!
//! Assignment edits arrive in bursts (drag a handful of entities into a
//! slot, reorder, rename). [`AutoSaver`] keeps only the latest snapshot and
//! writes it once the edits have been quiet for the debounce period.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::ConfigStore;
use crate::tent::AppConfig;

/// Background writer that coalesces config snapshots
pub struct AutoSaver {
    tx: watch::Sender<Option<AppConfig>>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Spawn the writer task on the current runtime
    pub fn spawn(store: ConfigStore, debounce: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(run(store, debounce, rx));
        Self { tx, handle }
    }

    /// Queue a snapshot, replacing any snapshot not yet written
    pub fn schedule(&self, config: AppConfig) {
        self.tx.send_replace(Some(config));
    }

    /// Write any pending snapshot and stop the writer
    pub async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!("Auto-save task ended abnormally: {}", e);
        }
    }
}

async fn run(store: ConfigStore, debounce: Duration, mut rx: watch::Receiver<Option<AppConfig>>) {
    while rx.changed().await.is_ok() {
        // Restart the quiet period on every new snapshot. A closed channel
        // ends the wait early so the last snapshot is still written.
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        let snapshot: Option<AppConfig> = (*rx.borrow_and_update()).clone();
        if let Some(config) = snapshot {
            match store.save(&config).await {
                Ok(()) => debug!("Auto-saved config"),
                Err(e) => warn!("Auto-save failed: {}", e),
            }
        }
    }
}
