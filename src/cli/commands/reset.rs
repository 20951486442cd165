use anyhow::Result;
use std::sync::Arc;

use super::Command;
use crate::config::HandoffConfig;
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::monitor::HandoffMonitor;

pub struct ResetCommand {
    config: HandoffConfig,
    fs_ops: Arc<dyn FileSystemOperations>,
}

impl ResetCommand {
    pub fn new(config: HandoffConfig) -> Self {
        Self {
            config,
            fs_ops: Arc::new(StandardFileSystem),
        }
    }
}

impl Command for ResetCommand {
    async fn execute(&self) -> Result<()> {
        println!("🔄 [OPERATOR] Resetting executor to READY");
        println!();

        let monitor = HandoffMonitor::from_config(&self.config, self.fs_ops.clone());

        let previous = monitor.store().load().await;
        if let Some(pr) = previous.blocked_on() {
            println!("🧹 Dropping pending audit of PR #{pr}");
        }

        let state = monitor.reset().await?;
        println!(
            "✅ Executor {} ({} monitor runs kept)",
            state.state,
            state.monitor_runs.len()
        );
        Ok(())
    }
}
