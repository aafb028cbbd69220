//! Live-state reconciliation
//!
//! [`Reconciler`] is a plain state machine: it owns the connection state,
//! the tent list, the alert summary and the pending-action flags, and is
//! mutated only through [`Reconciler::apply`] and the pending helpers. The
//! async [`Session`](crate::Session) drives it from the live channel.
//!
//! Every message replaces whole values: `initial_state` swaps the tent list,
//! `tent_update` swaps one tent's live state. A `tent_update` is treated as
//! authoritative for the entire tent, so it clears every pending flag of
//! that tent, not only the toggled actuator.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, trace};

use crate::message::{AlertSummary, LiveMessage};
use crate::state::TentLiveState;

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// `(tent_id, actuator_slot)`
pub type PendingKey = (String, String);

/// Locally held live state plus in-flight action flags
#[derive(Debug, Default)]
pub struct Reconciler {
    connection: ConnectionState,
    tents: Vec<TentLiveState>,
    alerts: AlertSummary,
    pending: BTreeSet<PendingKey>,
    revision: u64,
}

/// Reconciler shared between the session task and action callers
pub type SharedReconciler = Arc<RwLock<Reconciler>>;

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedReconciler {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            debug!("Live connection {:?} -> {:?}", self.connection, state);
            self.connection = state;
            self.revision += 1;
        }
    }

    pub fn tents(&self) -> &[TentLiveState] {
        &self.tents
    }

    pub fn tent(&self, tent_id: &str) -> Option<&TentLiveState> {
        self.tents.iter().find(|t| t.id == tent_id)
    }

    pub fn alerts(&self) -> &AlertSummary {
        &self.alerts
    }

    /// Bumped on every visible change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply one push message, returning whether anything changed
    #[instrument(skip_all)]
    pub fn apply(&mut self, message: LiveMessage) -> bool {
        match message {
            LiveMessage::InitialState { tents } => {
                info!("Received initial state with {} tents", tents.len());
                self.tents = tents;
                self.pending.clear();
            }
            LiveMessage::TentUpdate { tent_id, data } | LiveMessage::TentState { tent_id, data } => {
                self.replace_tent(tent_id, data);
            }
            LiveMessage::Alert { data } => {
                trace!("Merging {} alert summary fields", data.len());
                self.alerts.merge(data);
            }
            LiveMessage::Pong | LiveMessage::Unknown => return false,
        }
        self.revision += 1;
        true
    }

    fn replace_tent(&mut self, tent_id: String, mut data: TentLiveState) {
        data.id = tent_id;
        let cleared = self.clear_tent_pending(&data.id);
        debug!(tent = %data.id, cleared, "Applying tent update");

        match self.tents.iter_mut().find(|t| t.id == data.id) {
            Some(slot) => *slot = data,
            None => {
                debug!(tent = %data.id, "Update for unknown tent, appending");
                self.tents.push(data);
            }
        }
    }

    /// Flag an action as in flight; a second flag on the same key collapses
    pub fn mark_pending(&mut self, tent_id: &str, slot: &str) -> bool {
        let inserted = self
            .pending
            .insert((tent_id.to_string(), slot.to_string()));
        if inserted {
            self.revision += 1;
        }
        inserted
    }

    /// Drop one flag, e.g. after the action request failed
    pub fn clear_pending(&mut self, tent_id: &str, slot: &str) -> bool {
        let removed = self
            .pending
            .remove(&(tent_id.to_string(), slot.to_string()));
        if removed {
            self.revision += 1;
        }
        removed
    }

    fn clear_tent_pending(&mut self, tent_id: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(tent, _)| tent != tent_id);
        before - self.pending.len()
    }

    pub fn is_pending(&self, tent_id: &str, slot: &str) -> bool {
        self.pending
            .iter()
            .any(|(tent, s)| tent == tent_id && s == slot)
    }

    /// Slots of a tent with an action in flight
    pub fn pending_slots(&self, tent_id: &str) -> Vec<&str> {
        self.pending
            .iter()
            .filter(|(tent, _)| tent == tent_id)
            .map(|(_, slot)| slot.as_str())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
