//! Handoff Scenario Tests
//!
//! End-to-end coverage of the executor/auditor handoff against a real events
//! directory: request submission, acknowledgement and result pickup, timeout
//! alerts, and the manual-approval fallback.

use audit_handoff::config::HandoffConfig;
use audit_handoff::fs::{FileSystemOperations, StandardFileSystem};
use audit_handoff::monitor::{HandoffMonitor, StageOutcome, TickStage};
use audit_handoff::store::{ExecutorState, ExecutorStatus};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture owning an events directory and a monitor wired to it
struct HandoffFixture {
    temp_dir: TempDir,
    monitor: HandoffMonitor,
}

impl HandoffFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = HandoffConfig::default();
        config.paths.events_dir = temp_dir.path().to_path_buf();
        let fs: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
        let monitor = HandoffMonitor::from_config(&config, fs);

        Self { temp_dir, monitor }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    async fn seed(&self, state: ExecutorState) {
        let state = state.with_threshold_defaults(self.monitor.store().defaults());
        self.monitor.store().persist(&state).await.unwrap();
    }

    async fn state(&self) -> ExecutorState {
        self.monitor.store().load().await
    }

    fn write_json(&self, name: &str, value: Value) {
        std::fs::write(self.path(name), value.to_string()).unwrap();
    }

    fn fresh_heartbeat(&self, now: DateTime<Utc>) {
        self.write_json(
            "gemini-heartbeat.json",
            serde_json::json!({
                "status": "alive",
                "last_seen": rfc3339(now),
                "sla": { "ack_minutes": 15, "result_minutes": 60, "fallback_minutes": 240 }
            }),
        );
    }

    fn alert_lines(&self) -> Vec<String> {
        read_or_empty(&self.path("process-alert.md"))
            .lines()
            .filter(|line| line.starts_with("- **"))
            .map(str::to_string)
            .collect()
    }

    fn events(&self) -> Vec<Value> {
        read_or_empty(&self.path("event-log.jsonl"))
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn events_named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event["event"] == name)
            .collect()
    }
}

fn read_or_empty(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Document timestamps carry milliseconds, so keep test clocks on that grid
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn blocked_on_42(requested: DateTime<Utc>) -> ExecutorState {
    ExecutorState {
        state: ExecutorStatus::Blocked,
        pending_pr: Some(42),
        pending_request_id: Some("r1".to_string()),
        request_created_at: Some(requested),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scenario_a_submit_blocks_executor() {
    let fixture = HandoffFixture::new();
    let now = now_millis();

    let transition = fixture.monitor.submit(42, "r1", None, now).await.unwrap();
    assert!(transition.is_applied());

    let state = fixture.state().await;
    assert_eq!(state.state, ExecutorStatus::Blocked);
    assert_eq!(state.pending_pr, Some(42));
    assert_eq!(state.pending_request_id.as_deref(), Some("r1"));
    assert_eq!(state.request_created_at, Some(now));
    assert!(state.ack_received_at.is_none());
    assert!(state.result_received_at.is_none());
    assert!(!state.fallback_ready);
    assert!(state.is_consistent());

    let request: Value =
        serde_json::from_str(&read_or_empty(&fixture.path("audit-request-PR_42.json"))).unwrap();
    assert_eq!(request["pr_number"], 42);
    assert_eq!(request["request_id"], "r1");
    assert_eq!(fixture.events_named("audit-request-submitted").len(), 1);
}

#[tokio::test]
async fn test_scenario_b_ack_is_picked_up_once() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    let acked = now - Duration::minutes(2);
    fixture.seed(blocked_on_42(now - Duration::minutes(5))).await;
    fixture.fresh_heartbeat(now);
    fixture.write_json(
        "audit-ack-PR_42.json",
        serde_json::json!({ "timestamp": rfc3339(acked), "pr_number": 42, "status": "in_review" }),
    );

    fixture.monitor.tick_at(now).await;

    let state = fixture.state().await;
    assert_eq!(state.ack_received_at, Some(acked));
    assert_eq!(state.state, ExecutorStatus::Blocked);
    let acks = fixture.events_named("audit-ack-received");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0]["status"], "in_review");
    assert_eq!(acks[0]["pr_number"], 42);

    // The ack document stays in place; the state guard keeps it from applying twice
    let report = fixture.monitor.tick_at(now + Duration::minutes(1)).await;
    assert_eq!(report.outcome(TickStage::AckScan), Some(&StageOutcome::Skipped));
    assert_eq!(fixture.events_named("audit-ack-received").len(), 1);
    assert_eq!(fixture.state().await.ack_received_at, Some(acked));
}

#[tokio::test]
async fn test_scenario_c_ack_timeout_raises_one_n1_alert() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    fixture.seed(blocked_on_42(now - Duration::minutes(16))).await;
    fixture.fresh_heartbeat(now);

    let report = fixture.monitor.tick_at(now).await;
    assert!(!report.has_failures());

    let alerts = fixture.alert_lines();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("[N1]"));
    assert!(alerts[0].contains("TIMEOUT"));
    assert!(alerts[0].contains("PR 42"));
}

#[tokio::test]
async fn test_scenario_d_fallback_opens_once() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    fixture.seed(blocked_on_42(now - Duration::minutes(241))).await;
    fixture.fresh_heartbeat(now);

    fixture.monitor.tick_at(now).await;

    let state = fixture.state().await;
    assert!(state.fallback_ready);
    assert_eq!(state.fallback_since, Some(now));
    assert_eq!(state.state, ExecutorStatus::Blocked);

    let justification = read_or_empty(&fixture.path("fallback-justification.md"));
    assert!(justification.contains("42"));
    assert!(justification.contains("241m"));

    let crit_count = |lines: &[String]| lines.iter().filter(|l| l.contains("[CRIT]")).count();
    assert_eq!(crit_count(&fixture.alert_lines()), 1);

    fixture.monitor.tick_at(now + Duration::minutes(1)).await;
    assert_eq!(crit_count(&fixture.alert_lines()), 1);
    assert_eq!(fixture.state().await.fallback_since, Some(now));
}

#[tokio::test]
async fn test_scenario_e_approval_unblocks_executor() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    let finished = now - Duration::minutes(1);
    let mut state = blocked_on_42(now - Duration::minutes(300));
    state.ack_received_at = Some(now - Duration::minutes(250));
    state.fallback_ready = true;
    state.fallback_since = Some(now - Duration::minutes(60));
    fixture.seed(state).await;
    fixture.fresh_heartbeat(now);
    fixture.write_json(
        "audit-result-PR_42.json",
        serde_json::json!({
            "timestamp": rfc3339(finished),
            "pr_number": 42,
            "verdict": "APPROVED",
            "executor_unblock": true
        }),
    );

    fixture.monitor.tick_at(now).await;

    let state = fixture.state().await;
    assert_eq!(state.state, ExecutorStatus::Ready);
    assert_eq!(state.result_received_at, Some(finished));
    assert!(state.pending_pr.is_none());
    assert!(!state.fallback_ready);
    assert!(state.fallback_since.is_none());
    assert!(state.is_consistent());

    assert_eq!(fixture.events_named("audit-result-received").len(), 1);
    let unblocked = fixture.events_named("executor-unblocked");
    assert_eq!(unblocked.len(), 1);
    assert_eq!(unblocked[0]["pr_number"], 42);
    assert!(fixture.alert_lines().is_empty());
}

#[tokio::test]
async fn test_scenario_f_rejection_keeps_executor_blocked() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    let mut state = blocked_on_42(now - Duration::minutes(30));
    state.ack_received_at = Some(now - Duration::minutes(20));
    fixture.seed(state).await;
    fixture.fresh_heartbeat(now);
    fixture.write_json(
        "audit-result-PR_42.json",
        serde_json::json!({
            "timestamp": rfc3339(now - Duration::minutes(1)),
            "pr_number": 42,
            "verdict": "REJECTED",
            "executor_unblock": false
        }),
    );

    fixture.monitor.tick_at(now).await;
    fixture.monitor.tick_at(now + Duration::minutes(1)).await;

    let state = fixture.state().await;
    assert_eq!(state.state, ExecutorStatus::Blocked);
    assert_eq!(state.pending_pr, Some(42));

    let alerts = fixture.alert_lines();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("[CRIT]"));
    assert!(alerts[0].contains("REJECTED"));
    assert!(fixture.events_named("executor-unblocked").is_empty());
}

#[tokio::test]
async fn test_stale_heartbeat_alerts_only_while_blocked() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    fixture.fresh_heartbeat(now - Duration::minutes(30));

    fixture.monitor.tick_at(now).await;
    assert!(fixture.alert_lines().is_empty());

    fixture.seed(blocked_on_42(now - Duration::minutes(5))).await;
    fixture.monitor.tick_at(now).await;
    fixture.monitor.tick_at(now).await;

    let alerts = fixture.alert_lines();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.contains("[N1]") && a.contains("stale")));
}

#[tokio::test]
async fn test_result_for_other_pr_is_ignored() {
    let fixture = HandoffFixture::new();
    let now = now_millis();
    fixture.seed(blocked_on_42(now - Duration::minutes(5))).await;
    fixture.fresh_heartbeat(now);
    fixture.write_json(
        "audit-result-PR_43.json",
        serde_json::json!({
            "timestamp": rfc3339(now),
            "pr_number": 43,
            "verdict": "APPROVED",
            "executor_unblock": true
        }),
    );

    fixture.monitor.tick_at(now).await;

    let state = fixture.state().await;
    assert_eq!(state.state, ExecutorStatus::Blocked);
    assert!(state.result_received_at.is_none());
}

#[tokio::test]
async fn test_corrupt_state_document_recovers_as_ready() {
    let fixture = HandoffFixture::new();
    std::fs::write(fixture.path("executor-state.json"), "{ not json").unwrap();

    let report = fixture.monitor.tick_at(Utc::now()).await;

    assert!(!report.has_failures());
    assert_eq!(report.state.state, ExecutorStatus::Ready);
    let persisted: Value =
        serde_json::from_str(&read_or_empty(&fixture.path("executor-state.json"))).unwrap();
    assert_eq!(persisted["state"], "READY");
}

#[tokio::test]
async fn test_inconsistent_state_document_recovers_as_ready() {
    for document in [
        serde_json::json!({ "state": "BLOCKED", "pending_pr": null }),
        serde_json::json!({ "state": "READY", "pending_pr": 42 }),
    ] {
        let fixture = HandoffFixture::new();
        let now = now_millis();
        fixture.write_json("executor-state.json", document);

        let report = fixture.monitor.tick_at(now).await;
        assert!(!report.has_failures());
        assert_eq!(report.state.state, ExecutorStatus::Ready);

        let state = fixture.state().await;
        assert!(state.is_consistent());
        assert!(state.pending_pr.is_none());

        let transition = fixture.monitor.submit(42, "r1", None, now).await.unwrap();
        assert!(transition.is_applied());
        assert_eq!(fixture.state().await.pending_pr, Some(42));
    }
}
