use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use super::Command;
use crate::config::HandoffConfig;
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::handoff::{GuardFailure, TransitionResult};
use crate::inbox::MessageKind;
use crate::monitor::HandoffMonitor;
use crate::telemetry::generate_correlation_id;

pub struct SubmitCommand {
    pub pr: u64,
    pub request_id: Option<String>,
    pub requested_by: Option<String>,
    config: HandoffConfig,
    fs_ops: Arc<dyn FileSystemOperations>,
}

impl SubmitCommand {
    pub fn new(
        pr: u64,
        request_id: Option<String>,
        requested_by: Option<String>,
        config: HandoffConfig,
    ) -> Self {
        Self {
            pr,
            request_id,
            requested_by,
            config,
            fs_ops: Arc::new(StandardFileSystem),
        }
    }
}

impl Command for SubmitCommand {
    async fn execute(&self) -> Result<()> {
        let monitor = HandoffMonitor::from_config(&self.config, self.fs_ops.clone());

        let request_id = self
            .request_id
            .clone()
            .unwrap_or_else(generate_correlation_id);

        println!("📨 Submitting PR #{} for audit (request {})", self.pr, request_id);

        match monitor
            .submit(self.pr, &request_id, self.requested_by.clone(), Utc::now())
            .await?
        {
            TransitionResult::Applied { .. } => {
                println!("✅ Executor BLOCKED pending audit of PR #{}", self.pr);
                println!(
                    "   📄 Request published as {}",
                    MessageKind::Request.document_name(self.pr)
                );
            }
            TransitionResult::Ignored(GuardFailure::NotReady { pending_pr }) => {
                let pending = pending_pr
                    .map(|pr| format!("#{pr}"))
                    .unwrap_or_else(|| "an unknown PR".to_string());
                println!("⚠️  Executor already BLOCKED on {pending}; request not submitted");
                println!("   💡 Wait for the audit result or run 'audit-handoff reset'");
            }
            TransitionResult::Ignored(reason) => {
                println!("⚠️  Request not submitted: {reason:?}");
            }
        }
        Ok(())
    }
}
