//! Rule engine
//!
//! Periodically runs every registered rule against the reconciled live state
//! and the local clock, and issues the resulting actuator actions through the
//! action sink. Issued actions go through [`issue`], so they show up as
//! pending until the next `tent_update` for the tent. A rule's state only
//! advances once its action was accepted; a failed action is decided again
//! on the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, Timelike, Utc};
use tent_automation::readings::sensor_value;
use tent_automation::{
    AutomationRegistry, AutomationRule, Command, Decision, LiveReadings, RuleEvaluator, RuleInput,
    RuleTrigger,
};
use tent_live::{issue, ActionRequest, ActionSink, ActuatorAction, SharedReconciler, TentLiveState};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Drives a [`RuleEvaluator`] from live state
pub struct RuleEngine {
    registry: Arc<dyn AutomationRegistry>,
    reconciler: SharedReconciler,
    sink: Arc<dyn ActionSink>,
    evaluator: Arc<Mutex<RuleEvaluator>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RuleEngine {
    pub fn new(
        registry: Arc<dyn AutomationRegistry>,
        reconciler: SharedReconciler,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry,
            reconciler,
            sink,
            evaluator: Arc::new(Mutex::new(RuleEvaluator::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Evaluate on every `tick` until [`stop`](Self::stop) is called
    pub fn start(&self, tick: Duration) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Rule engine already running");
            return;
        }
        info!("Starting rule engine (tick {:?})", tick);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let registry = self.registry.clone();
        let reconciler = self.reconciler.clone();
        let sink = self.sink.clone();
        let evaluator = self.evaluator.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::process(
                            registry.as_ref(),
                            &reconciler,
                            sink.as_ref(),
                            &evaluator,
                            Utc::now(),
                            local_minute(),
                        )
                        .await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            running.store(false, Ordering::SeqCst);
            info!("Rule engine stopped");
        });
    }

    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        info!("Stopping rule engine");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one evaluation pass at the given instant and local minute
    pub async fn evaluate_at(&self, now: DateTime<Utc>, minute: NaiveTime) -> usize {
        Self::process(
            self.registry.as_ref(),
            &self.reconciler,
            self.sink.as_ref(),
            &self.evaluator,
            now,
            minute,
        )
        .await
    }

    /// One pass: decide under the locks, issue without holding them, then
    /// commit the steps whose actions went through
    async fn process(
        registry: &dyn AutomationRegistry,
        reconciler: &SharedReconciler,
        sink: &dyn ActionSink,
        evaluator: &Mutex<RuleEvaluator>,
        now: DateTime<Utc>,
        minute: NaiveTime,
    ) -> usize {
        let rules = match registry.list().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Could not list automation rules: {}", e);
                return 0;
            }
        };

        let decisions: Vec<Decision> = {
            let live = reconciler.read().await;
            let mut evaluator = evaluator.lock().await;
            evaluator.retain(&rules);
            rules
                .iter()
                .filter_map(|rule| {
                    let input = input_for(rule, live.tent(&rule.tent_id), minute)?;
                    evaluator.decide(rule, input, now)
                })
                .collect()
        };

        let mut issued = 0;
        for decision in decisions {
            let request = ActionRequest::new(
                decision.tent_id.as_str(),
                decision.actuator.as_str(),
                action_for(decision.command),
            );
            match issue(reconciler, sink, request).await {
                Ok(()) => {
                    evaluator
                        .lock()
                        .await
                        .commit(&decision.rule_id, decision.step, now);
                    issued += 1;
                }
                Err(e) => warn!("Rule {} could not act: {}", decision.rule_id, e),
            }
        }
        if issued > 0 {
            debug!("Rule engine issued {} actions", issued);
        }
        issued
    }
}

fn local_minute() -> NaiveTime {
    let time = Local::now().time();
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Input a rule sees in the current live state, if any
fn input_for<'a>(
    rule: &AutomationRule,
    live: Option<&'a TentLiveState>,
    minute: NaiveTime,
) -> Option<RuleInput<'a>> {
    match &rule.trigger {
        RuleTrigger::Schedule { .. } => Some(RuleInput::Clock(minute)),
        RuleTrigger::SensorState { sensor, .. } => live?.sensor_state(sensor).map(RuleInput::State),
        trigger => {
            let sensor = trigger.sensor()?;
            sensor_value(live?, sensor).map(RuleInput::Reading)
        }
    }
}

fn action_for(command: Command) -> ActuatorAction {
    match command {
        Command::TurnOn => ActuatorAction::TurnOn,
        Command::TurnOff => ActuatorAction::TurnOff,
        Command::SetSpeed(percentage) => ActuatorAction::SetSpeed { percentage },
    }
}
