// Handoff inbox - per-request documents exchanged with the auditor
//
// Production reads and writes `audit-<kind>-PR_<id>.json` files in the events
// directory; tests use the in-memory fake.

pub mod filesystem;
pub mod memory;
pub mod messages;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use filesystem::FileSystemInbox;
pub use memory::MemoryInbox;
pub use messages::{AuditAck, AuditRequest, AuditResult, MessageKind, Verdict};

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("IO error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Malformed {kind} document {path}: {source}")]
    Malformed {
        kind: MessageKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A handoff document present in the inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub kind: MessageKind,
    pub pr_number: u64,
    pub name: String,
}

/// Typed message queue keyed by PR number
///
/// Presence of a message plus the matching `*_received_at` field still being
/// empty in the state document is the consumption guard; `mark_consumed` is a
/// hint to the backing store, not the source of truth.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Publish the executor's review request
    async fn publish_request(&self, request: &AuditRequest) -> Result<(), InboxError>;

    /// The acknowledgement for `pr_number`, if the auditor produced one
    async fn fetch_ack(&self, pr_number: u64) -> Result<Option<AuditAck>, InboxError>;

    /// The result for `pr_number`, if the auditor produced one
    async fn fetch_result(&self, pr_number: u64) -> Result<Option<AuditResult>, InboxError>;

    /// Record that a message has been applied to the state
    async fn mark_consumed(&self, kind: MessageKind, pr_number: u64) -> Result<(), InboxError>;

    /// Every handoff document currently present
    async fn list(&self) -> Result<Vec<InboxEntry>, InboxError>;
}
