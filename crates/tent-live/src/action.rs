//! Actuator actions with optimistic pending flags

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tent_core::domains::is_on_state;
use tracing::{debug, warn};

use crate::error::{LiveError, LiveResult};
use crate::reconciler::SharedReconciler;

/// What to do with an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActuatorAction {
    TurnOn,
    TurnOff,
    SetSpeed { percentage: u8 },
}

impl ActuatorAction {
    pub fn name(self) -> &'static str {
        match self {
            ActuatorAction::TurnOn => "turn_on",
            ActuatorAction::TurnOff => "turn_off",
            ActuatorAction::SetSpeed { .. } => "set_speed",
        }
    }
}

/// Action a toggle issues given the actuator's current state
pub fn toggle_action(current_state: Option<&str>) -> ActuatorAction {
    if current_state.map_or(false, is_on_state) {
        ActuatorAction::TurnOff
    } else {
        ActuatorAction::TurnOn
    }
}

/// `(tent, actuator slot, action)` request handed to the command sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub tent_id: String,
    pub slot: String,
    #[serde(flatten)]
    pub action: ActuatorAction,
}

impl ActionRequest {
    pub fn new(tent_id: impl Into<String>, slot: impl Into<String>, action: ActuatorAction) -> Self {
        Self {
            tent_id: tent_id.into(),
            slot: slot.into(),
            action,
        }
    }
}

/// Command sink accepting actuator actions
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn send(&self, request: &ActionRequest) -> LiveResult<()>;
}

/// Issue an action: flag it pending first, clear the flag if the sink fails
///
/// On success the flag stays set until the next `tent_update` for the tent.
pub async fn issue(
    reconciler: &SharedReconciler,
    sink: &dyn ActionSink,
    request: ActionRequest,
) -> LiveResult<()> {
    reconciler
        .write()
        .await
        .mark_pending(&request.tent_id, &request.slot);
    debug!(
        tent = %request.tent_id,
        slot = %request.slot,
        action = request.action.name(),
        "Issuing action"
    );

    if let Err(e) = sink.send(&request).await {
        reconciler
            .write()
            .await
            .clear_pending(&request.tent_id, &request.slot);
        warn!(
            "Action {} on {}/{} failed: {}",
            request.action.name(),
            request.tent_id,
            request.slot,
            e
        );
        return Err(LiveError::ActionFailed {
            tent_id: request.tent_id,
            slot: request.slot,
            reason: e.to_string(),
        });
    }
    Ok(())
}

/// Toggle an actuator based on its reconciled state
pub async fn toggle(
    reconciler: &SharedReconciler,
    sink: &dyn ActionSink,
    tent_id: &str,
    slot: &str,
) -> LiveResult<ActuatorAction> {
    let action = {
        let state = reconciler.read().await;
        let tent = state
            .tent(tent_id)
            .ok_or_else(|| LiveError::UnknownTent(tent_id.to_string()))?;
        toggle_action(tent.actuators.get(slot).map(|a| a.state.as_str()))
    };
    issue(reconciler, sink, ActionRequest::new(tent_id, slot, action)).await?;
    Ok(action)
}
