//! Init command: prepare a working directory for the handoff monitor
//!
//! Creates the events directory and writes the effective configuration to
//! `handoff-monitor.toml` (or the `--config` path). An existing configuration
//! file is only replaced with `--force`. Existing state and logs are never
//! touched.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::Command;
use crate::config::{HandoffConfig, DEFAULT_CONFIG_FILE};
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::store::{DocumentLayout, DocumentStore, ExecutorState};

pub struct InitCommand {
    pub force: bool,
    config: HandoffConfig,
    config_path: PathBuf,
    fs_ops: Arc<dyn FileSystemOperations>,
}

impl InitCommand {
    pub fn new(
        force: bool,
        config: HandoffConfig,
        config_path: Option<PathBuf>,
        fs_ops: Arc<dyn FileSystemOperations>,
    ) -> Self {
        Self {
            force,
            config,
            config_path: config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
            fs_ops,
        }
    }

    pub fn with_standard_fs(force: bool, config: HandoffConfig, config_path: Option<PathBuf>) -> Self {
        Self::new(force, config, config_path, Arc::new(StandardFileSystem))
    }
}

impl Command for InitCommand {
    async fn execute(&self) -> Result<()> {
        println!("🚀 AUDIT HANDOFF INIT");
        println!("=====================");
        println!();

        if self.fs_ops.exists(&self.config_path) && !self.force {
            return Err(anyhow!(
                "{} already exists. Use --force to overwrite it.",
                self.config_path.display()
            ));
        }

        let store = DocumentStore::new(
            self.fs_ops.clone(),
            DocumentLayout::from_config(&self.config),
            self.config.sla,
        );
        let layout = store.layout();
        store.ensure_directories().await.with_context(|| {
            format!(
                "Cannot create events directory {}",
                layout.events_dir.display()
            )
        })?;
        println!("📁 Events directory: {}", layout.events_dir.display());

        if self.fs_ops.exists(&layout.state_file) {
            println!("📄 Keeping existing state document {}", layout.state_file.display());
        } else {
            store
                .persist(&ExecutorState::ready(&self.config.sla))
                .await?;
            println!("📄 Created state document {} (READY)", layout.state_file.display());
        }

        self.config
            .save_to_file(&self.config_path)
            .with_context(|| format!("Cannot write {}", self.config_path.display()))?;
        println!("⚙️  Wrote configuration to {}", self.config_path.display());

        println!();
        println!("✅ Ready. Next: 'audit-handoff submit <PR>' then 'audit-handoff monitor'");
        Ok(())
    }
}
