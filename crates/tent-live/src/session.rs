//! Session driver
//!
//! Connects the live channel, feeds every message into the shared
//! [`Reconciler`] and reconnects after a fixed delay whenever the channel
//! closes or fails. There is no retry cap. Dropping or shutting down the
//! session aborts the task, which also cancels any pending reconnect timer.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::LiveChannel;
use crate::error::LiveError;
use crate::reconciler::{ConnectionState, Reconciler, SharedReconciler};

/// A running live session
pub struct Session {
    reconciler: SharedReconciler,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Start the session on the current runtime
    pub fn spawn(
        channel: Arc<dyn LiveChannel>,
        reconciler: SharedReconciler,
        reconnect_delay: Duration,
    ) -> Self {
        let handle = tokio::spawn(run(channel, reconciler.clone(), reconnect_delay));
        Self {
            reconciler,
            handle: Some(handle),
        }
    }

    pub fn reconciler(&self) -> &SharedReconciler {
        &self.reconciler
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the session and mark it disconnected
    ///
    /// Waits for the task to wind down first, so nothing it does can land
    /// after the `Disconnected` state.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Live session task failed: {}", e);
                }
            }
        }
        self.reconciler
            .write()
            .await
            .set_connection(ConnectionState::Disconnected);
        info!("Live session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

async fn set_state(reconciler: &SharedReconciler, state: ConnectionState) {
    reconciler.write().await.set_connection(state);
}

async fn run(channel: Arc<dyn LiveChannel>, reconciler: SharedReconciler, delay: Duration) {
    let mut failures: u64 = 0;
    loop {
        set_state(&reconciler, ConnectionState::Connecting).await;

        match channel.connect().await {
            Ok(mut stream) => {
                failures = 0;
                set_state(&reconciler, ConnectionState::Connected).await;
                info!("Live channel connected");

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(message) => {
                            reconciler.write().await.apply(message);
                        }
                        Err(LiveError::Json(e)) => {
                            warn!("Ignoring malformed live message: {}", e);
                        }
                        Err(e) => {
                            warn!("Live channel error: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                failures += 1;
                warn!("Live channel connect failed (attempt {}): {}", failures, e);
            }
        }

        set_state(&reconciler, ConnectionState::Disconnected).await;
        debug!("Reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

/// Convenience: a fresh reconciler plus a running session
pub fn start(channel: Arc<dyn LiveChannel>, reconnect_delay: Duration) -> Session {
    Session::spawn(channel, Reconciler::shared(), reconnect_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageStream;
    use crate::error::LiveResult;
    use crate::message::LiveMessage;
    use crate::state::TentLiveState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedChannel {
        batches: Mutex<VecDeque<Vec<LiveMessage>>>,
        connects: AtomicUsize,
    }

    impl ScriptedChannel {
        fn new(batches: Vec<Vec<LiveMessage>>) -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(batches.into()),
                connects: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LiveChannel for ScriptedChannel {
        async fn connect(&self) -> LiveResult<MessageStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match self.batches.lock().unwrap().pop_front() {
                Some(batch) => Ok(futures::stream::iter(batch.into_iter().map(Ok)).boxed()),
                None => Err(LiveError::Channel("refused".into())),
            }
        }
    }

    async fn wait_for<F: Fn() -> bool>(check: F) {
        for _ in 0..400 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_reconnects_and_reconciles() {
        let mut t1 = TentLiveState::new("t1", "Tent 1");
        t1.avg_temperature = Some(25.0);
        let channel = ScriptedChannel::new(vec![
            vec![LiveMessage::InitialState {
                tents: vec![
                    TentLiveState::new("t1", "Tent 1"),
                    TentLiveState::new("t2", "Tent 2").with_sensor("co2", 800),
                ],
            }],
            vec![LiveMessage::TentUpdate {
                tent_id: "t1".into(),
                data: t1,
            }],
        ]);

        let mut session = start(channel.clone(), Duration::from_millis(10));
        let rec = session.reconciler().clone();

        let watched = rec.clone();
        wait_for(|| {
            watched
                .try_read()
                .map(|r| r.tent("t1").and_then(|t| t.avg_temperature) == Some(25.0))
                .unwrap_or(false)
        })
        .await;

        let state = rec.read().await;
        assert_eq!(state.tents().len(), 2);
        assert_eq!(
            state.tent("t2").unwrap(),
            &TentLiveState::new("t2", "Tent 2").with_sensor("co2", 800)
        );
        drop(state);
        assert!(channel.connects.load(Ordering::SeqCst) >= 2);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_reconnect() {
        let channel = ScriptedChannel::new(Vec::new());
        let mut session = start(channel.clone(), Duration::from_millis(5));

        wait_for(|| channel.connects.load(Ordering::SeqCst) >= 2).await;
        session.shutdown().await;
        assert!(!session.is_running());

        let after = channel.connects.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(channel.connects.load(Ordering::SeqCst), after);
        assert_eq!(
            session.reconciler().read().await.connection(),
            ConnectionState::Disconnected
        );

        // a second shutdown is harmless
        session.shutdown().await;
        assert_eq!(
            session.reconciler().read().await.connection(),
            ConnectionState::Disconnected
        );
    }
}
