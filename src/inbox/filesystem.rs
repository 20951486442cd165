use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{AuditAck, AuditRequest, AuditResult, Inbox, InboxEntry, InboxError, MessageKind};
use crate::fs::FileSystemOperations;

static DOCUMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^audit-(request|ack|result)-PR_(\d+)\.json$").expect("valid document name regex")
});

/// Inbox backed by JSON documents in the events directory
///
/// Auditor documents are left in place once applied; other collaborators
/// read them too.
pub struct FileSystemInbox {
    fs: Arc<dyn FileSystemOperations>,
    dir: PathBuf,
}

impl FileSystemInbox {
    pub fn new(fs: Arc<dyn FileSystemOperations>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn document_path(&self, kind: MessageKind, pr_number: u64) -> PathBuf {
        self.dir.join(kind.document_name(pr_number))
    }

    async fn read_document<T: DeserializeOwned>(
        &self,
        kind: MessageKind,
        pr_number: u64,
    ) -> Result<Option<T>, InboxError> {
        let path = self.document_path(kind, pr_number);
        let contents = self
            .fs
            .read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        match contents {
            None => Ok(None),
            Some(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|source| InboxError::Malformed { kind, path, source }),
        }
    }
}

fn io_error(path: &Path, e: anyhow::Error) -> InboxError {
    InboxError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Parse `audit-<kind>-PR_<id>.json`
pub fn parse_document_name(name: &str) -> Option<InboxEntry> {
    let captures = DOCUMENT_NAME.captures(name)?;
    Some(InboxEntry {
        kind: MessageKind::parse(&captures[1])?,
        pr_number: captures[2].parse().ok()?,
        name: name.to_string(),
    })
}

#[async_trait]
impl Inbox for FileSystemInbox {
    async fn publish_request(&self, request: &AuditRequest) -> Result<(), InboxError> {
        let path = self.document_path(MessageKind::Request, request.pr_number);
        let serialized = serde_json::to_string_pretty(request).map_err(|source| {
            InboxError::Malformed {
                kind: MessageKind::Request,
                path: path.clone(),
                source,
            }
        })?;

        self.fs
            .write_atomic(&path, serialized.as_bytes())
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(
            pr = %request.pr_number,
            request_id = %request.request_id,
            file = ?path,
            "Audit request published"
        );
        Ok(())
    }

    async fn fetch_ack(&self, pr_number: u64) -> Result<Option<AuditAck>, InboxError> {
        self.read_document(MessageKind::Ack, pr_number).await
    }

    async fn fetch_result(&self, pr_number: u64) -> Result<Option<AuditResult>, InboxError> {
        self.read_document(MessageKind::Result, pr_number).await
    }

    async fn mark_consumed(&self, kind: MessageKind, pr_number: u64) -> Result<(), InboxError> {
        debug!(kind = %kind, pr = %pr_number, "Handoff document applied");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InboxEntry>, InboxError> {
        let names = self
            .fs
            .list_file_names(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        Ok(names
            .iter()
            .filter_map(|name| parse_document_name(name))
            .collect())
    }
}
