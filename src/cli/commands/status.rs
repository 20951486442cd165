use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::Command;
use crate::config::HandoffConfig;
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::heartbeat::{HeartbeatChecker, HeartbeatStatus};
use crate::monitor::HandoffMonitor;
use crate::store::ExecutorState;

pub struct StatusCommand {
    config: HandoffConfig,
    fs_ops: Arc<dyn FileSystemOperations>,
}

impl StatusCommand {
    pub fn new(config: HandoffConfig) -> Self {
        Self {
            config,
            fs_ops: Arc::new(StandardFileSystem),
        }
    }
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let monitor = HandoffMonitor::from_config(&self.config, self.fs_ops.clone());
        let (state, entries) = monitor.snapshot().await?;
        let now = Utc::now();

        println!("🛂 AUDIT HANDOFF STATUS");
        println!("=======================");
        println!();

        match state.blocked_on() {
            Some(pr) => println!("🔴 Executor BLOCKED on PR #{pr}"),
            None => println!("🟢 Executor READY"),
        }
        if let Some(request_id) = &state.pending_request_id {
            println!("   🆔 Request: {request_id}");
        }
        println!();

        print_timers(&state, &self.config, now);

        println!("💓 AUDITOR HEARTBEAT:");
        let heartbeat = HeartbeatChecker::new(self.fs_ops.clone(), self.config.heartbeat_file());
        match heartbeat.check(now).await {
            HeartbeatStatus::Fresh {
                delay_minutes: Some(delay),
            } => println!("   ✅ Fresh (last seen {delay}m ago)"),
            HeartbeatStatus::Fresh { delay_minutes: None } => {
                println!("   ✅ Present (no last_seen recorded)")
            }
            status => {
                if let Some(alert) = status.alert(heartbeat.path()) {
                    println!("   ⚠️  {}", alert.message);
                }
            }
        }
        println!();

        println!("📂 HANDOFF DOCUMENTS ({}):", self.config.paths.events_dir.display());
        if entries.is_empty() {
            println!("   (none)");
        }
        for entry in &entries {
            println!("   📄 {} ({} for PR #{})", entry.name, entry.kind, entry.pr_number);
        }
        println!();

        match state.monitor_runs.last() {
            Some(run) => println!(
                "🖥️  Monitor runs: {} (last started {} on {})",
                state.monitor_runs.len(),
                run.started_at.to_rfc3339(),
                run.hostname.as_deref().unwrap_or("unknown host")
            ),
            None => println!("🖥️  Monitor has never run"),
        }
        if let Some(checked) = state.last_state_check {
            println!("🕐 Last state check: {}", checked.to_rfc3339());
        }
        Ok(())
    }
}

fn print_timers(state: &ExecutorState, config: &HandoffConfig, now: DateTime<Utc>) {
    let Some(requested) = state.request_created_at else {
        return;
    };
    let thresholds = state.thresholds(&config.sla);
    let waited = |since: DateTime<Utc>| now.signed_duration_since(since).num_minutes();

    println!("⏱️  SLA TIMERS:");
    println!(
        "   📨 Requested {} ({}m ago)",
        requested.to_rfc3339(),
        waited(requested)
    );
    match state.ack_received_at {
        Some(acked) => println!("   ✅ ACK received {}", acked.to_rfc3339()),
        None => println!(
            "   ⏳ ACK pending: {}m of {}m",
            waited(requested),
            thresholds.ack_minutes
        ),
    }
    match (state.ack_received_at, state.result_received_at) {
        (_, Some(finished)) => println!("   ✅ RESULT received {}", finished.to_rfc3339()),
        (Some(acked), None) => println!(
            "   ⏳ RESULT pending: {}m of {}m",
            waited(acked),
            thresholds.result_minutes
        ),
        (None, None) => {}
    }
    if state.fallback_ready {
        let since = state
            .fallback_since
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        println!("   🚨 FALLBACK READY since {since}: manual approval required before merge");
    } else if state.result_received_at.is_none() {
        println!(
            "   🛟 Fallback opens at {}m ({}m elapsed)",
            thresholds.fallback_minutes,
            waited(requested)
        );
    }
    println!();
}
