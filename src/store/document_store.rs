use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::types::{Alert, ExecutorState, FallbackJustification, HandoffEvent};
use crate::config::{HandoffConfig, SlaThresholds};
use crate::fs::FileSystemOperations;

const ALERT_LOG_HEADER: &str = "# Process Alerts\n\nAppend-only. One line per alert: timestamp, level (N1, N2, CRIT), message.\n\n";

/// Errors that can occur during state persistence operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Write to {path} failed: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Another writer holds the state lock {path}")]
    LockContended { path: PathBuf },
}

/// Where each durable document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    pub events_dir: PathBuf,
    pub state_file: PathBuf,
    pub heartbeat_file: PathBuf,
}

impl DocumentLayout {
    pub fn new(events_dir: impl Into<PathBuf>) -> Self {
        let events_dir = events_dir.into();
        Self {
            state_file: events_dir.join("executor-state.json"),
            heartbeat_file: events_dir.join("gemini-heartbeat.json"),
            events_dir,
        }
    }

    pub fn from_config(config: &HandoffConfig) -> Self {
        Self {
            events_dir: config.paths.events_dir.clone(),
            state_file: config.state_file(),
            heartbeat_file: config.heartbeat_file(),
        }
    }

    pub fn event_log(&self) -> PathBuf {
        self.events_dir.join("event-log.jsonl")
    }

    pub fn alert_log(&self) -> PathBuf {
        self.events_dir.join("process-alert.md")
    }

    pub fn fallback_justification(&self) -> PathBuf {
        self.events_dir.join("fallback-justification.md")
    }

    pub fn lock_file(&self) -> PathBuf {
        let mut name = self
            .state_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.state_file.with_file_name(name)
    }
}

/// Read/write/append access to the state document and the two logs
#[derive(Clone)]
pub struct DocumentStore {
    fs: Arc<dyn FileSystemOperations>,
    layout: DocumentLayout,
    defaults: SlaThresholds,
}

impl DocumentStore {
    pub fn new(
        fs: Arc<dyn FileSystemOperations>,
        layout: DocumentLayout,
        defaults: SlaThresholds,
    ) -> Self {
        Self {
            fs,
            layout,
            defaults,
        }
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    pub fn defaults(&self) -> &SlaThresholds {
        &self.defaults
    }

    /// Create the events directory (and the state file's parent)
    pub async fn ensure_directories(&self) -> Result<(), StoreError> {
        self.create_dir(&self.layout.events_dir).await?;
        if let Some(parent) = self.layout.state_file.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir(parent).await?;
            }
        }
        Ok(())
    }

    async fn create_dir(&self, dir: &Path) -> Result<(), StoreError> {
        self.fs
            .create_dir_all(dir)
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Load the state document. Never fails: a missing, unreadable or
    /// malformed document, or one where `pending_pr` disagrees with the
    /// READY/BLOCKED state, yields the READY default.
    pub async fn load(&self) -> ExecutorState {
        let path = &self.layout.state_file;
        let contents = match self.fs.read_to_string(path).await {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                debug!(file = ?path, "No state document, starting READY");
                return ExecutorState::ready(&self.defaults);
            }
            Err(e) => {
                warn!(file = ?path, error = %e, "State document unreadable, starting READY");
                return ExecutorState::ready(&self.defaults);
            }
        };

        match serde_json::from_str::<ExecutorState>(&contents) {
            Ok(state) if state.is_consistent() => state.with_threshold_defaults(&self.defaults),
            Ok(state) => {
                warn!(
                    file = ?path,
                    state = %state.state,
                    pending_pr = ?state.pending_pr,
                    "State document inconsistent, starting READY"
                );
                ExecutorState::ready(&self.defaults)
            }
            Err(e) => {
                warn!(file = ?path, error = %e, "State document corrupt, starting READY");
                ExecutorState::ready(&self.defaults)
            }
        }
    }

    /// Overwrite the state document atomically
    pub async fn persist(&self, state: &ExecutorState) -> Result<(), StoreError> {
        let path = &self.layout.state_file;
        let mut serialized = serde_json::to_string_pretty(state)?;
        serialized.push('\n');

        self.fs
            .write_atomic(path, serialized.as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            file = ?path,
            state = %state.state,
            pending_pr = ?state.pending_pr,
            "State persisted"
        );
        Ok(())
    }

    /// Append one event line. Failures are logged, never propagated.
    pub async fn append_event(&self, event: &HandoffEvent) {
        let path = self.layout.event_log();
        let line = match serde_json::to_string(event) {
            Ok(mut line) => {
                line.push('\n');
                line
            }
            Err(e) => {
                error!(event = event.name(), error = %e, "Failed to serialize event");
                return;
            }
        };

        match self.fs.append(&path, line.as_bytes()).await {
            Ok(()) => info!(event = event.name(), "Event appended"),
            Err(e) => error!(event = event.name(), file = ?path, error = %e, "Failed to append event"),
        }
    }

    /// Append one alert line, writing the log header first if the log is new.
    /// Failures are logged, never propagated.
    pub async fn append_alert(&self, alert: &Alert, at: DateTime<Utc>) {
        match alert.level {
            super::AlertLevel::Crit => error!(level = %alert.level, "{}", alert.message),
            _ => warn!(level = %alert.level, "{}", alert.message),
        }

        let path = self.layout.alert_log();
        if !self.fs.exists(&path) {
            if let Err(e) = self.fs.append(&path, ALERT_LOG_HEADER.as_bytes()).await {
                error!(file = ?path, error = %e, "Failed to write alert log header");
                return;
            }
        }

        if let Err(e) = self.fs.append(&path, alert.render(at).as_bytes()).await {
            error!(file = ?path, error = %e, "Failed to append alert");
        }
    }

    /// Write the fallback justification document
    pub async fn write_fallback_justification(
        &self,
        justification: &FallbackJustification,
    ) -> Result<(), StoreError> {
        let path = self.layout.fallback_justification();
        self.fs
            .write_atomic(&path, justification.to_markdown().as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        info!(
            pr = %justification.pr_number,
            file = ?path,
            "Fallback justification written"
        );
        Ok(())
    }
}
