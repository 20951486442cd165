//! Poll loop driving the handoff
//!
//! Each tick loads the state document, and while the executor is BLOCKED
//! runs the heartbeat check, the ack and result scans and the SLA evaluation,
//! in that order. Stages that change state work on a copy and persist it
//! before their events and alerts go out, so a later failure never discards
//! an earlier stage's committed work.

pub mod tick;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::HandoffConfig;
use crate::fs::FileSystemOperations;
use crate::handoff::{HandoffMachine, TransitionResult};
use crate::heartbeat::HeartbeatChecker;
use crate::inbox::{AuditRequest, FileSystemInbox, Inbox, InboxEntry, InboxError, MessageKind};
use crate::sla::SlaEvaluator;
use crate::store::{
    Alert, DocumentLayout, DocumentStore, ExecutorState, HandoffEvent, MonitorRun, StateGuard,
    StateLock, StoreError,
};
use crate::telemetry::{create_tick_span, generate_correlation_id};

pub use tick::{StageOutcome, TickReport, TickStage};

/// How long a writer waits for another process to finish with the state document
pub const STATE_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Cannot create events directory {path}: {source}")]
    EventsDir {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Inbox(#[from] InboxError),
}

pub struct HandoffMonitor {
    store: DocumentStore,
    inbox: Arc<dyn Inbox>,
    heartbeat: HeartbeatChecker,
    evaluator: SlaEvaluator,
    lock_file: Option<PathBuf>,
}

impl HandoffMonitor {
    pub fn new(
        store: DocumentStore,
        inbox: Arc<dyn Inbox>,
        heartbeat: HeartbeatChecker,
        evaluator: SlaEvaluator,
    ) -> Self {
        Self {
            store,
            inbox,
            heartbeat,
            evaluator,
            lock_file: None,
        }
    }

    /// Serialize every load-modify-persist sequence on `path` with other processes
    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    /// Production wiring: every document lives under the configured events directory
    pub fn from_config(config: &HandoffConfig, fs: Arc<dyn FileSystemOperations>) -> Self {
        let layout = DocumentLayout::from_config(config);
        let inbox = Arc::new(FileSystemInbox::new(fs.clone(), layout.events_dir.clone()));
        let heartbeat = HeartbeatChecker::new(fs.clone(), layout.heartbeat_file.clone());
        let store = DocumentStore::new(fs, layout.clone(), config.sla);
        let evaluator = SlaEvaluator::new(config.sla, config.monitor.repeat_timeout_alerts);
        let lock_file = layout.lock_file();
        Self::new(store, inbox, heartbeat, evaluator).with_lock_file(lock_file)
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    async fn ensure_events_dir(&self) -> Result<(), MonitorError> {
        self.store
            .ensure_directories()
            .await
            .map_err(|source| MonitorError::EventsDir {
                path: self.store.layout().events_dir.clone(),
                source,
            })
    }

    fn state_lock(&self) -> Result<Option<StateLock>, StoreError> {
        self.lock_file.as_deref().map(StateLock::open).transpose()
    }

    /// Record a process start. Failing to create the events directory is the
    /// only fatal condition.
    pub async fn start(&self, now: DateTime<Utc>) -> Result<ExecutorState, MonitorError> {
        let layout = self.store.layout();
        self.ensure_events_dir().await?;

        let mut lock = self.state_lock();
        let guard = match &mut lock {
            Ok(lock) => hold(lock).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let mut state = self.store.load().await;
        state.monitor_runs.push(MonitorRun {
            started_at: now,
            events_dir: layout.events_dir.clone(),
            hostname: hostname::get()
                .ok()
                .map(|name| name.to_string_lossy().to_string()),
            pid: Some(std::process::id()),
        });

        match guard {
            Ok(_guard) => {
                if let Err(e) = self.store.persist(&state).await {
                    error!(error = %e, "Failed to record monitor start in state document");
                }
            }
            Err(e) => error!(error = %e, "State lock unavailable, monitor start not recorded"),
        }
        self.store
            .append_event(&HandoffEvent::MonitorStart {
                timestamp: now,
                events_dir: layout.events_dir.clone(),
                state_file: layout.state_file.clone(),
            })
            .await;

        info!(
            events_dir = ?layout.events_dir,
            state = %state.state,
            pending_pr = ?state.pending_pr,
            "Handoff monitor started"
        );
        Ok(state)
    }

    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// One evaluation pass as of `now`. The state lock is held from load to
    /// the final persist and released before the next tick.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let mut lock = self.state_lock();
        let guard = match &mut lock {
            Ok(lock) => hold(lock).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let state = self.store.load().await;
        let correlation_id = generate_correlation_id();
        let span = create_tick_span("tick", state.pending_pr, &correlation_id);

        match guard {
            Ok(_guard) => {
                self.run_stages(state, now, correlation_id)
                    .instrument(span)
                    .await
            }
            Err(error) => {
                let _entered = span.enter();
                error!(error = %error, "State lock unavailable, tick skipped");
                let mut report = TickReport::new(now, correlation_id, state);
                report.record(TickStage::Persist, StageOutcome::Failed { error });
                report
            }
        }
    }

    async fn run_stages(
        &self,
        mut state: ExecutorState,
        now: DateTime<Utc>,
        correlation_id: String,
    ) -> TickReport {
        let mut report = TickReport::new(now, correlation_id, state.clone());

        let heartbeat = match state.blocked_on() {
            Some(_) => self.check_heartbeat(now).await,
            None => StageOutcome::Skipped,
        };
        report.record(TickStage::Heartbeat, heartbeat);

        let ack_scan = match state.blocked_on() {
            Some(pr) if state.ack_received_at.is_none() => {
                self.scan_ack(&mut state, pr, now).await
            }
            _ => StageOutcome::Skipped,
        };
        report.record(TickStage::AckScan, ack_scan);

        let result_scan = match state.blocked_on() {
            Some(pr) if state.result_received_at.is_none() => {
                self.scan_result(&mut state, pr, now).await
            }
            _ => StageOutcome::Skipped,
        };
        report.record(TickStage::ResultScan, result_scan);

        let sla = match state.blocked_on() {
            Some(_) => self.evaluate_sla(&mut state, now).await,
            None => StageOutcome::Skipped,
        };
        report.record(TickStage::SlaEvaluation, sla);

        state.last_state_check = Some(now);
        let persist = match self.store.persist(&state).await {
            Ok(()) => StageOutcome::quiet(),
            Err(e) => StageOutcome::Failed {
                error: e.to_string(),
            },
        };
        report.record(TickStage::Persist, persist);

        for (stage, outcome) in &report.stages {
            if let StageOutcome::Failed { error } = outcome {
                error!(stage = %stage, error = %error, "Tick stage failed");
            }
        }
        debug!(
            state = %state.state,
            alerts = %report.alerts_raised(),
            "Tick complete"
        );

        report.state = state;
        report
    }

    async fn check_heartbeat(&self, now: DateTime<Utc>) -> StageOutcome {
        let status = self.heartbeat.check(now).await;
        let alerts: Vec<Alert> = status.alert(self.heartbeat.path()).into_iter().collect();
        self.emit(&[], &alerts, now).await
    }

    async fn scan_ack(&self, state: &mut ExecutorState, pr: u64, now: DateTime<Utc>) -> StageOutcome {
        let ack = match self.inbox.fetch_ack(pr).await {
            Ok(Some(ack)) => ack,
            Ok(None) => return StageOutcome::quiet(),
            Err(e) => {
                return StageOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let mut working = state.clone();
        let transition = HandoffMachine::receive_ack(&mut working, &ack, now);
        self.commit(state, working, transition, MessageKind::Ack, pr, now)
            .await
    }

    async fn scan_result(
        &self,
        state: &mut ExecutorState,
        pr: u64,
        now: DateTime<Utc>,
    ) -> StageOutcome {
        let result = match self.inbox.fetch_result(pr).await {
            Ok(Some(result)) => result,
            Ok(None) => return StageOutcome::quiet(),
            Err(e) => {
                return StageOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let mut working = state.clone();
        let transition = HandoffMachine::receive_result(&mut working, &result, now);
        self.commit(state, working, transition, MessageKind::Result, pr, now)
            .await
    }

    /// Persist a transition's state, then publish its events and alerts
    async fn commit(
        &self,
        state: &mut ExecutorState,
        working: ExecutorState,
        transition: TransitionResult,
        kind: MessageKind,
        pr: u64,
        now: DateTime<Utc>,
    ) -> StageOutcome {
        if let TransitionResult::Ignored(reason) = &transition {
            warn!(kind = %kind, pr = %pr, reason = ?reason, "Handoff document not applied");
            return StageOutcome::quiet();
        }

        if let Err(e) = self.store.persist(&working).await {
            return StageOutcome::Failed {
                error: e.to_string(),
            };
        }
        *state = working;

        if let Err(e) = self.inbox.mark_consumed(kind, pr).await {
            warn!(kind = %kind, pr = %pr, error = %e, "Failed to mark handoff document consumed");
        }
        self.emit(transition.events(), transition.alerts(), now)
            .await
    }

    async fn evaluate_sla(&self, state: &mut ExecutorState, now: DateTime<Utc>) -> StageOutcome {
        let mut working = state.clone();
        let outcome = self.evaluator.evaluate(&mut working, now);
        if working == *state {
            return self.emit(&[], &outcome.alerts, now).await;
        }

        if let Some(justification) = &outcome.fallback {
            if let Err(e) = self.store.write_fallback_justification(justification).await {
                return StageOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }
        if let Err(e) = self.store.persist(&working).await {
            return StageOutcome::Failed {
                error: e.to_string(),
            };
        }
        *state = working;

        self.emit(&[], &outcome.alerts, now).await
    }

    async fn emit(&self, events: &[HandoffEvent], alerts: &[Alert], now: DateTime<Utc>) -> StageOutcome {
        for event in events {
            self.store.append_event(event).await;
        }
        for alert in alerts {
            self.store.append_alert(alert, now).await;
        }
        StageOutcome::Completed {
            alerts: alerts.len(),
            events: events.len(),
        }
    }

    /// Single-shot mode: record the start, evaluate once
    pub async fn run_once(&self) -> Result<TickReport, MonitorError> {
        self.start(Utc::now()).await?;
        Ok(self.tick().await)
    }

    /// Continuous mode: evaluate immediately, then every `interval` until
    /// `shutdown` flips to true. Returns the number of ticks run.
    pub async fn run_continuous(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<u64, MonitorError> {
        self.start(Utc::now()).await?;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        info!(interval_ms = %interval.as_millis(), "Continuous monitoring started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    ticks += 1;
                    if report.has_failures() {
                        warn!(tick = %ticks, "Tick completed with failed stages");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(ticks = %ticks, "Continuous monitoring stopped");
        Ok(ticks)
    }

    /// Block the executor on a new review request and publish the request document
    pub async fn submit(
        &self,
        pr: u64,
        request_id: &str,
        requested_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionResult, MonitorError> {
        self.ensure_events_dir().await?;
        let mut lock = self.state_lock()?;
        let _guard = hold(&mut lock).await?;

        let mut state = self.store.load().await;
        let transition = HandoffMachine::submit_request(&mut state, pr, request_id, now);
        if !transition.is_applied() {
            return Ok(transition);
        }

        self.inbox
            .publish_request(&AuditRequest {
                timestamp: now,
                pr_number: pr,
                request_id: request_id.to_string(),
                requested_by,
            })
            .await?;
        self.store.persist(&state).await?;
        self.emit(transition.events(), transition.alerts(), now)
            .await;

        Ok(transition)
    }

    /// Operator reset to READY, keeping the run history
    pub async fn reset(&self) -> Result<ExecutorState, MonitorError> {
        self.ensure_events_dir().await?;
        let mut lock = self.state_lock()?;
        let _guard = hold(&mut lock).await?;

        let previous = self.store.load().await;
        let mut state = ExecutorState::ready(self.store.defaults());
        state.monitor_runs = previous.monitor_runs;
        state.last_state_check = previous.last_state_check;

        self.store.persist(&state).await?;
        warn!(
            previous_state = %previous.state,
            previous_pr = ?previous.pending_pr,
            "Executor state reset to READY by operator"
        );
        Ok(state)
    }

    /// Current state and the handoff documents on hand
    pub async fn snapshot(&self) -> Result<(ExecutorState, Vec<InboxEntry>), MonitorError> {
        let state = self.store.load().await;
        let entries = self.inbox.list().await?;
        Ok((state, entries))
    }
}

async fn hold(lock: &mut Option<StateLock>) -> Result<Option<StateGuard<'_>>, StoreError> {
    match lock {
        Some(lock) => lock.acquire(STATE_LOCK_TIMEOUT).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlaThresholds;
    use crate::fs::{MockFileSystemOperations, StandardFileSystem};
    use crate::inbox::{AuditAck, AuditResult, MemoryInbox, Verdict};
    use crate::store::{ExecutorStatus, SlaCondition};
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    struct Harness {
        _temp_dir: TempDir,
        inbox: Arc<MemoryInbox>,
        monitor: HandoffMonitor,
    }

    impl Harness {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let fs: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
            let layout = DocumentLayout::new(temp_dir.path());
            let inbox = Arc::new(MemoryInbox::new());
            let monitor = HandoffMonitor::new(
                DocumentStore::new(fs.clone(), layout.clone(), SlaThresholds::default()),
                inbox.clone(),
                HeartbeatChecker::new(fs, layout.heartbeat_file.clone()),
                SlaEvaluator::new(SlaThresholds::default(), false),
            );
            Self {
                _temp_dir: temp_dir,
                inbox,
                monitor,
            }
        }

        fn alert_log(&self) -> String {
            std::fs::read_to_string(self.monitor.store().layout().alert_log()).unwrap_or_default()
        }

        fn event_log(&self) -> Vec<serde_json::Value> {
            std::fs::read_to_string(self.monitor.store().layout().event_log())
                .unwrap_or_default()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }

        fn write_fresh_heartbeat(&self, now: DateTime<Utc>) {
            std::fs::write(
                &self.monitor.store().layout().heartbeat_file,
                format!(r#"{{"status": "alive", "last_seen": "{}", "sla": {{"ack_minutes": 15}}}}"#, now.to_rfc3339()),
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_ready_tick_only_persists() {
        let harness = Harness::new();
        let now = Utc::now();

        let report = harness.monitor.tick_at(now).await;

        assert_eq!(report.outcome(TickStage::Heartbeat), Some(&StageOutcome::Skipped));
        assert_eq!(report.outcome(TickStage::AckScan), Some(&StageOutcome::Skipped));
        assert_eq!(report.outcome(TickStage::SlaEvaluation), Some(&StageOutcome::Skipped));
        assert!(!report.has_failures());
        assert!(harness.alert_log().is_empty());

        let persisted = harness.monitor.store().load().await;
        assert_eq!(persisted.last_state_check, Some(now));
        assert_eq!(persisted.state, ExecutorStatus::Ready);
    }

    #[tokio::test]
    async fn test_start_records_monitor_run_and_event() {
        let harness = Harness::new();
        let now = Utc::now();

        harness.monitor.start(now).await.unwrap();
        harness.monitor.start(now).await.unwrap();

        let state = harness.monitor.store().load().await;
        assert_eq!(state.monitor_runs.len(), 2);
        assert_eq!(state.monitor_runs[0].started_at, now);

        let events = harness.event_log();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "monitor-start");
    }

    #[tokio::test]
    async fn test_full_approval_cycle() {
        let harness = Harness::new();
        let submitted = Utc::now() - ChronoDuration::minutes(30);

        let transition = harness
            .monitor
            .submit(42, "r1", Some("executor".to_string()), submitted)
            .await
            .unwrap();
        assert!(transition.is_applied());
        assert_eq!(harness.inbox.request(42).unwrap().request_id, "r1");

        let acked = submitted + ChronoDuration::minutes(5);
        harness.inbox.deliver_ack(AuditAck {
            timestamp: acked,
            pr_number: 42,
            ack_type: None,
            status: Some("in_review".to_string()),
        });
        harness.write_fresh_heartbeat(Utc::now());
        let report = harness.monitor.tick().await;
        assert_eq!(report.state.ack_received_at, Some(acked));
        assert_eq!(report.alerts_raised(), 0);

        let finished = submitted + ChronoDuration::minutes(25);
        harness.inbox.deliver_result(AuditResult {
            timestamp: finished,
            pr_number: 42,
            verdict: Verdict::Approved,
            executor_unblock: true,
        });
        let report = harness.monitor.tick().await;
        assert_eq!(report.state.state, ExecutorStatus::Ready);
        assert!(report.state.pending_pr.is_none());
        assert_eq!(report.state.result_received_at, Some(finished));
        assert_eq!(report.outcome(TickStage::SlaEvaluation), Some(&StageOutcome::Skipped));

        assert_eq!(
            harness.inbox.consumed(),
            vec![(MessageKind::Ack, 42), (MessageKind::Result, 42)]
        );
        let names: Vec<String> = harness
            .event_log()
            .iter()
            .map(|e| e["event"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "audit-request-submitted",
                "audit-ack-received",
                "audit-result-received",
                "executor-unblocked"
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_result_keeps_ack_and_sla_work() {
        let harness = Harness::new();
        let now = Utc::now();
        harness
            .monitor
            .submit(42, "r1", None, now - ChronoDuration::minutes(250))
            .await
            .unwrap();
        harness.write_fresh_heartbeat(now);
        let acked = now - ChronoDuration::minutes(10);
        harness.inbox.deliver_ack(AuditAck {
            timestamp: acked,
            pr_number: 42,
            ack_type: None,
            status: None,
        });
        harness.inbox.deliver_malformed(MessageKind::Result, 42);

        let report = harness.monitor.tick_at(now).await;

        assert!(report.outcome(TickStage::ResultScan).unwrap().is_failed());
        assert!(!report.outcome(TickStage::AckScan).unwrap().is_failed());
        assert!(!report.outcome(TickStage::SlaEvaluation).unwrap().is_failed());

        let persisted = harness.monitor.store().load().await;
        assert_eq!(persisted.ack_received_at, Some(acked));
        assert!(persisted.fallback_ready);
        assert!(persisted.result_received_at.is_none());
        assert!(harness.alert_log().contains("FALLBACK READY for PR 42"));
    }

    #[tokio::test]
    async fn test_timeout_alert_guard_survives_restart() {
        let harness = Harness::new();
        let now = Utc::now();
        harness
            .monitor
            .submit(42, "r1", None, now - ChronoDuration::minutes(20))
            .await
            .unwrap();
        harness.write_fresh_heartbeat(now);

        let first = harness.monitor.tick_at(now).await;
        assert_eq!(first.alerts_raised(), 1);
        assert_eq!(first.state.raised_alerts, vec![SlaCondition::AckTimeout]);

        harness.monitor.start(now).await.unwrap();
        let second = harness.monitor.tick_at(now + ChronoDuration::minutes(1)).await;
        assert_eq!(second.alerts_raised(), 0);
        assert_eq!(harness.alert_log().matches("TIMEOUT").count(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported_not_fatal() {
        let mut mock_fs = MockFileSystemOperations::new();
        mock_fs.expect_read_to_string().returning(|_| Ok(None));
        mock_fs
            .expect_write_atomic()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));

        let fs: Arc<dyn FileSystemOperations> = Arc::new(mock_fs);
        let layout = DocumentLayout::new("/nowhere");
        let monitor = HandoffMonitor::new(
            DocumentStore::new(fs.clone(), layout.clone(), SlaThresholds::default()),
            Arc::new(MemoryInbox::new()),
            HeartbeatChecker::new(fs, layout.heartbeat_file),
            SlaEvaluator::new(SlaThresholds::default(), false),
        );

        let report = monitor.tick().await;
        assert!(report.outcome(TickStage::Persist).unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_submit_while_blocked_publishes_nothing() {
        let harness = Harness::new();
        let now = Utc::now();
        harness.monitor.submit(42, "r1", None, now).await.unwrap();

        let second = harness.monitor.submit(43, "r2", None, now).await.unwrap();
        assert!(!second.is_applied());
        assert!(harness.inbox.request(43).is_none());
        assert_eq!(harness.monitor.store().load().await.pending_pr, Some(42));
    }

    #[tokio::test]
    async fn test_reset_keeps_run_history() {
        let harness = Harness::new();
        let now = Utc::now();
        harness.monitor.start(now).await.unwrap();
        harness.monitor.submit(42, "r1", None, now).await.unwrap();

        let state = harness.monitor.reset().await.unwrap();
        assert_eq!(state.state, ExecutorStatus::Ready);
        assert!(state.pending_pr.is_none());
        assert_eq!(state.monitor_runs.len(), 1);
        assert_eq!(harness.monitor.store().load().await, state);
    }

    #[tokio::test]
    async fn test_continuous_mode_ticks_until_shutdown() {
        let harness = Harness::new();
        let (sender, receiver) = watch::channel(false);

        let run = harness
            .monitor
            .run_continuous(Duration::from_millis(10), receiver);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sender.send(true).unwrap();
        };

        let (ticks, ()) = tokio::join!(run, stop);
        assert!(ticks.unwrap() >= 1);
        assert_eq!(harness.monitor.store().load().await.monitor_runs.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_lands_between_ticks_of_running_monitor() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = HandoffConfig::default();
        config.paths.events_dir = temp_dir.path().to_path_buf();
        let fs: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
        let running = HandoffMonitor::from_config(&config, fs.clone());
        let operator = HandoffMonitor::from_config(&config, fs);
        let (sender, receiver) = watch::channel(false);

        let run = running.run_continuous(Duration::from_millis(10), receiver);
        let submit = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            let transition = operator.submit(42, "r1", None, Utc::now()).await;
            tokio::time::sleep(Duration::from_millis(40)).await;
            sender.send(true).unwrap();
            transition
        };

        let (ticks, transition) = tokio::join!(run, submit);
        assert!(ticks.unwrap() >= 2);
        assert!(transition.unwrap().is_applied());

        let state = operator.store().load().await;
        assert_eq!(state.pending_pr, Some(42));
        assert_eq!(state.monitor_runs.len(), 1);
        assert!(state.last_state_check.unwrap() > state.request_created_at.unwrap());
    }

    #[tokio::test]
    async fn test_continuous_mode_exits_when_already_shut_down() {
        let harness = Harness::new();
        let (_sender, receiver) = watch::channel(true);

        let ticks = harness
            .monitor
            .run_continuous(Duration::from_millis(10), receiver)
            .await
            .unwrap();
        assert_eq!(ticks, 0);
    }
}
