//! Live tent state for the grow-tent dashboard
//!
//! This crate keeps the locally displayed sensor and actuator state in step
//! with push updates while user actions are in flight.
//!
//! - [`TentLiveState`] - one tent's readings, VPD, score and alerts
//! - [`LiveMessage`] - `initial_state`, `tent_update` and `alert` messages
//! - [`Reconciler`] - applies messages and tracks pending action flags
//! - [`Session`] - async driver with fixed-delay reconnect
//! - [`ActionSink`] / [`issue`] / [`toggle`] - optimistic actuator actions
//! - [`WsChannel`], [`HttpActionSink`], [`HttpAutomationRegistry`] - network
//!   implementations of the collaborator traits
//! - [`LiveStateBuilder`] - the provider-side computation of averages, VPD,
//!   environment score and alerts
//!
//! # Example
//!
//! ```ignore
//! use std::{sync::Arc, time::Duration};
//! use tent_live::{session, toggle, HttpActionSink, WsChannel};
//!
//! let channel = Arc::new(WsChannel::new("http://localhost:8099", None));
//! let live = session::start(channel, Duration::from_secs(3));
//! let sink = HttpActionSink::new("http://localhost:8099", None)?;
//! toggle(live.reconciler(), &sink, "t1", "exhaust_fan").await?;
//! ```

pub mod action;
pub mod builder;
pub mod channel;
pub mod error;
pub mod http;
pub mod message;
pub mod reconciler;
pub mod session;
pub mod state;

pub use action::{issue, toggle, toggle_action, ActionRequest, ActionSink, ActuatorAction};
pub use builder::{calculate_vpd, check_alerts, environment_score, LiveStateBuilder};
pub use channel::{LiveChannel, MessageStream, WsChannel};
pub use error::{LiveError, LiveResult};
pub use http::{HttpActionSink, HttpAutomationRegistry};
pub use message::{Alert, AlertSummary, ClientMessage, LiveMessage, Severity};
pub use reconciler::{ConnectionState, PendingKey, Reconciler, SharedReconciler};
pub use session::Session;
pub use state::{ActuatorReading, SensorReading, TentLiveState};
