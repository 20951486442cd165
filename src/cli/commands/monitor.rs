use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use super::Command;
use crate::config::{HandoffConfig, RunMode};
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::monitor::{HandoffMonitor, StageOutcome, TickReport};
use crate::shutdown::ShutdownCoordinator;

pub struct MonitorCommand {
    config: HandoffConfig,
    fs_ops: Arc<dyn FileSystemOperations>,
}

impl MonitorCommand {
    pub fn new(config: HandoffConfig) -> Self {
        Self {
            config,
            fs_ops: Arc::new(StandardFileSystem),
        }
    }
}

impl Command for MonitorCommand {
    async fn execute(&self) -> Result<()> {
        let monitor = HandoffMonitor::from_config(&self.config, self.fs_ops.clone());

        match self.config.monitor.mode {
            RunMode::SingleShot => {
                let report = monitor.run_once().await?;
                print_report(&report);
            }
            RunMode::Continuous => {
                let interval = Duration::from_millis(self.config.monitor.poll_interval_ms.max(1));
                println!(
                    "👀 Monitoring {} every {}ms (Ctrl-C to stop)",
                    self.config.paths.events_dir.display(),
                    interval.as_millis()
                );

                let shutdown = ShutdownCoordinator::new();
                shutdown.install_signal_handlers()?;
                let ticks = monitor.run_continuous(interval, shutdown.subscribe()).await?;
                println!("🛑 Monitor stopped after {ticks} ticks");
            }
        }
        Ok(())
    }
}

fn print_report(report: &TickReport) {
    println!(
        "🔎 Tick at {} - executor {}",
        report.started_at.to_rfc3339(),
        report.state.state
    );
    if let Some(pr) = report.state.pending_pr {
        println!("   📌 Pending PR: #{pr}");
    }
    for (stage, outcome) in &report.stages {
        match outcome {
            StageOutcome::Skipped => println!("   ⏭️  {stage}: skipped"),
            StageOutcome::Completed { alerts, events } => {
                println!("   ✅ {stage}: {alerts} alerts, {events} events")
            }
            StageOutcome::Failed { error } => println!("   ❌ {stage}: {error}"),
        }
    }
    if report.state.fallback_ready {
        println!("   🚨 Fallback ready: manual approval required before merge");
    }
}
