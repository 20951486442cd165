use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of per-request handoff documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Request,
    Ack,
    Result,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Ack => "ack",
            MessageKind::Result => "result",
        }
    }

    /// `audit-<kind>-PR_<id>.json`
    pub fn document_name(&self, pr_number: u64) -> String {
        format!("audit-{}-PR_{}.json", self.as_str(), pr_number)
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "request" => Some(MessageKind::Request),
            "ack" => Some(MessageKind::Ack),
            "result" => Some(MessageKind::Result),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published by the executor when it blocks on review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub timestamp: DateTime<Utc>,
    pub pr_number: u64,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
}

/// Auditor acknowledgement that review has started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAck {
    pub timestamp: DateTime<Utc>,
    pub pr_number: u64,
    #[serde(default)]
    pub ack_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Rejected,
    ReviewPending,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approved => write!(f, "APPROVED"),
            Verdict::Rejected => write!(f, "REJECTED"),
            Verdict::ReviewPending => write!(f, "REVIEW_PENDING"),
        }
    }
}

/// Auditor's final word on a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub timestamp: DateTime<Utc>,
    pub pr_number: u64,
    pub verdict: Verdict,
    #[serde(default)]
    pub executor_unblock: bool,
}
