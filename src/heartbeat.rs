//! Auditor liveness check
//!
//! The auditor subsystem keeps a heartbeat document up to date independently
//! of any request. While the executor is blocked, a missing, unreadable or
//! stale heartbeat raises an N1 alert on every tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::fs::FileSystemOperations;
use crate::store::{Alert, AlertLevel};

const DEFAULT_HEARTBEAT_ACK_MINUTES: u64 = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatSla {
    #[serde(default)]
    pub ack_minutes: Option<u64>,
    #[serde(default)]
    pub result_minutes: Option<u64>,
    #[serde(default)]
    pub fallback_minutes: Option<u64>,
}

/// Liveness document produced by the auditor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sla: HeartbeatSla,
}

/// What the check found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Fresh { delay_minutes: Option<i64> },
    Absent,
    Unreadable { reason: String },
    Stale { delay_minutes: i64, sla_minutes: u64 },
}

impl HeartbeatStatus {
    pub fn alert(&self, path: &std::path::Path) -> Option<Alert> {
        match self {
            HeartbeatStatus::Fresh { .. } => None,
            HeartbeatStatus::Absent => Some(Alert::new(
                AlertLevel::N1,
                format!("Heartbeat absent: {} not found", path.display()),
            )),
            HeartbeatStatus::Unreadable { reason } => Some(Alert::new(
                AlertLevel::N1,
                format!("Heartbeat unreadable ({}): {reason}", path.display()),
            )),
            HeartbeatStatus::Stale {
                delay_minutes,
                sla_minutes,
            } => Some(Alert::new(
                AlertLevel::N1,
                format!("Heartbeat stale: last seen {delay_minutes}m ago (SLA {sla_minutes}m)"),
            )),
        }
    }
}

pub struct HeartbeatChecker {
    fs: Arc<dyn FileSystemOperations>,
    path: PathBuf,
}

impl HeartbeatChecker {
    pub fn new(fs: Arc<dyn FileSystemOperations>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Inspect the heartbeat document as of `now`
    pub async fn check(&self, now: DateTime<Utc>) -> HeartbeatStatus {
        let contents = match self.fs.read_to_string(&self.path).await {
            Ok(Some(contents)) => contents,
            Ok(None) => return HeartbeatStatus::Absent,
            Err(e) => {
                return HeartbeatStatus::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        match serde_json::from_str::<Heartbeat>(&contents) {
            Ok(heartbeat) => evaluate(&heartbeat, now),
            Err(e) => HeartbeatStatus::Unreadable {
                reason: e.to_string(),
            },
        }
    }
}

/// Staleness is judged against the heartbeat's own declared ACK budget
pub fn evaluate(heartbeat: &Heartbeat, now: DateTime<Utc>) -> HeartbeatStatus {
    let Some(last_seen) = heartbeat.last_seen else {
        return HeartbeatStatus::Fresh {
            delay_minutes: None,
        };
    };

    let delay_minutes = now.signed_duration_since(last_seen).num_minutes();
    let sla_minutes = heartbeat
        .sla
        .ack_minutes
        .unwrap_or(DEFAULT_HEARTBEAT_ACK_MINUTES);

    debug!(
        status = ?heartbeat.status,
        delay_minutes = %delay_minutes,
        sla_minutes = %sla_minutes,
        "Heartbeat evaluated"
    );

    if delay_minutes > crate::sla::budget_minutes(sla_minutes) {
        HeartbeatStatus::Stale {
            delay_minutes,
            sla_minutes,
        }
    } else {
        HeartbeatStatus::Fresh {
            delay_minutes: Some(delay_minutes),
        }
    }
}
