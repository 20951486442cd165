use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::SlaThresholds;
use crate::inbox::Verdict;

/// Whether the executor may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorStatus {
    #[default]
    Ready,
    Blocked,
}

impl fmt::Display for ExecutorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorStatus::Ready => write!(f, "READY"),
            ExecutorStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Timeout conditions that have already produced an alert for the pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlaCondition {
    AckTimeout,
    ResultTimeout,
}

/// One process (re)start of the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorRun {
    pub started_at: DateTime<Utc>,
    pub events_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// The single mutable executor state document
///
/// Invariant: `pending_pr.is_none()` exactly when `state == Ready`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutorState {
    pub state: ExecutorStatus,
    pub pending_pr: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request_id: Option<String>,
    pub request_created_at: Option<DateTime<Utc>>,
    pub ack_received_at: Option<DateTime<Utc>>,
    pub result_received_at: Option<DateTime<Utc>>,
    pub timeout_threshold_ack_minutes: Option<u64>,
    pub timeout_threshold_result_minutes: Option<u64>,
    pub fallback_threshold_minutes: Option<u64>,
    #[serde(default)]
    pub fallback_ready: bool,
    pub fallback_since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raised_alerts: Vec<SlaCondition>,
    pub last_state_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub monitor_runs: Vec<MonitorRun>,
}

impl ExecutorState {
    /// READY state with every threshold filled from `defaults`
    pub fn ready(defaults: &SlaThresholds) -> Self {
        Self::default().with_threshold_defaults(defaults)
    }

    /// Fill thresholds the document omits
    pub fn with_threshold_defaults(mut self, defaults: &SlaThresholds) -> Self {
        self.timeout_threshold_ack_minutes
            .get_or_insert(defaults.ack_minutes);
        self.timeout_threshold_result_minutes
            .get_or_insert(defaults.result_minutes);
        self.fallback_threshold_minutes
            .get_or_insert(defaults.fallback_minutes);
        self
    }

    /// Thresholds in force for this document, falling back to process defaults
    pub fn thresholds(&self, defaults: &SlaThresholds) -> SlaThresholds {
        SlaThresholds {
            ack_minutes: self
                .timeout_threshold_ack_minutes
                .unwrap_or(defaults.ack_minutes),
            result_minutes: self
                .timeout_threshold_result_minutes
                .unwrap_or(defaults.result_minutes),
            fallback_minutes: self
                .fallback_threshold_minutes
                .unwrap_or(defaults.fallback_minutes),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ExecutorStatus::Blocked
    }

    /// PR under review while BLOCKED
    pub fn blocked_on(&self) -> Option<u64> {
        if self.is_blocked() {
            self.pending_pr
        } else {
            None
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.pending_pr.is_none() == (self.state == ExecutorStatus::Ready)
    }
}

/// Alert severity, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    N1,
    N2,
    #[serde(rename = "CRIT")]
    Crit,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::N1 => write!(f, "N1"),
            AlertLevel::N2 => write!(f, "N2"),
            AlertLevel::Crit => write!(f, "CRIT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// `- **<ISO8601>** [<LEVEL>]: <message>`
    pub fn render(&self, at: DateTime<Utc>) -> String {
        format!(
            "- **{}** [{}]: {}\n",
            at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// Domain events appended to the event log, one JSON object per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HandoffEvent {
    MonitorStart {
        timestamp: DateTime<Utc>,
        events_dir: PathBuf,
        state_file: PathBuf,
    },
    AuditRequestSubmitted {
        timestamp: DateTime<Utc>,
        pr_number: u64,
        request_id: String,
    },
    AuditAckReceived {
        timestamp: DateTime<Utc>,
        pr_number: u64,
        ack_type: Option<String>,
        status: Option<String>,
        acknowledged_at: DateTime<Utc>,
    },
    AuditResultReceived {
        timestamp: DateTime<Utc>,
        pr_number: u64,
        verdict: Verdict,
        executor_unblock: bool,
        completed_at: DateTime<Utc>,
    },
    ExecutorUnblocked {
        timestamp: DateTime<Utc>,
        pr_number: u64,
    },
}

impl HandoffEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HandoffEvent::MonitorStart { .. } => "monitor-start",
            HandoffEvent::AuditRequestSubmitted { .. } => "audit-request-submitted",
            HandoffEvent::AuditAckReceived { .. } => "audit-ack-received",
            HandoffEvent::AuditResultReceived { .. } => "audit-result-received",
            HandoffEvent::ExecutorUnblocked { .. } => "executor-unblocked",
        }
    }
}

/// Record written when the manual approval path opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackJustification {
    pub pr_number: u64,
    pub request_id: Option<String>,
    pub elapsed_minutes: i64,
    pub threshold_minutes: u64,
    pub generated_at: DateTime<Utc>,
}

impl FallbackJustification {
    pub fn to_markdown(&self) -> String {
        let mut doc = String::new();
        doc.push_str("# Fallback Justification\n\n");
        doc.push_str(&format!("- **PR**: {}\n", self.pr_number));
        if let Some(request_id) = &self.request_id {
            doc.push_str(&format!("- **Request**: {request_id}\n"));
        }
        doc.push_str(&format!(
            "- **Elapsed since request**: {}m\n",
            self.elapsed_minutes
        ));
        doc.push_str(&format!(
            "- **Fallback threshold**: {}m\n",
            self.threshold_minutes
        ));
        doc.push_str(&format!(
            "- **Generated at**: {}\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        doc.push_str(
            "The auditor produced no result within the fallback threshold. \
             The manual approval path is open.\n\n",
        );
        doc.push_str("**MANUAL APPROVAL REQUIRED BEFORE MERGE.**\n");
        doc
    }
}
