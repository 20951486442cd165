use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{AuditAck, AuditRequest, AuditResult, Inbox, InboxEntry, InboxError, MessageKind};

/// In-memory inbox for tests and embedding
///
/// Unlike the file-backed inbox, consumed messages are removed, and the
/// consumption calls are recorded for assertions.
#[derive(Debug, Default)]
pub struct MemoryInbox {
    requests: Mutex<HashMap<u64, AuditRequest>>,
    acks: Mutex<HashMap<u64, AuditAck>>,
    results: Mutex<HashMap<u64, AuditResult>>,
    consumed: Mutex<Vec<(MessageKind, u64)>>,
    poisoned: Mutex<HashSet<(MessageKind, u64)>>,
}

impl MemoryInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver_ack(&self, ack: AuditAck) {
        self.acks.lock().unwrap().insert(ack.pr_number, ack);
    }

    pub fn deliver_result(&self, result: AuditResult) {
        self.results.lock().unwrap().insert(result.pr_number, result);
    }

    /// Make the next fetches of this message fail as if the document were malformed
    pub fn deliver_malformed(&self, kind: MessageKind, pr_number: u64) {
        self.poisoned.lock().unwrap().insert((kind, pr_number));
    }

    pub fn request(&self, pr_number: u64) -> Option<AuditRequest> {
        self.requests.lock().unwrap().get(&pr_number).cloned()
    }

    pub fn consumed(&self) -> Vec<(MessageKind, u64)> {
        self.consumed.lock().unwrap().clone()
    }

    fn check_poisoned(&self, kind: MessageKind, pr_number: u64) -> Result<(), InboxError> {
        if self.poisoned.lock().unwrap().contains(&(kind, pr_number)) {
            let source = serde_json::from_str::<serde_json::Value>("{ malformed")
                .expect_err("literal is not valid JSON");
            return Err(InboxError::Malformed {
                kind,
                path: kind.document_name(pr_number).into(),
                source,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Inbox for MemoryInbox {
    async fn publish_request(&self, request: &AuditRequest) -> Result<(), InboxError> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.pr_number, request.clone());
        Ok(())
    }

    async fn fetch_ack(&self, pr_number: u64) -> Result<Option<AuditAck>, InboxError> {
        self.check_poisoned(MessageKind::Ack, pr_number)?;
        Ok(self.acks.lock().unwrap().get(&pr_number).cloned())
    }

    async fn fetch_result(&self, pr_number: u64) -> Result<Option<AuditResult>, InboxError> {
        self.check_poisoned(MessageKind::Result, pr_number)?;
        Ok(self.results.lock().unwrap().get(&pr_number).cloned())
    }

    async fn mark_consumed(&self, kind: MessageKind, pr_number: u64) -> Result<(), InboxError> {
        match kind {
            MessageKind::Request => {
                self.requests.lock().unwrap().remove(&pr_number);
            }
            MessageKind::Ack => {
                self.acks.lock().unwrap().remove(&pr_number);
            }
            MessageKind::Result => {
                self.results.lock().unwrap().remove(&pr_number);
            }
        }
        self.consumed.lock().unwrap().push((kind, pr_number));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InboxEntry>, InboxError> {
        let entry = |kind: MessageKind, pr_number: u64| InboxEntry {
            kind,
            pr_number,
            name: kind.document_name(pr_number),
        };

        let mut entries: Vec<InboxEntry> = Vec::new();
        entries.extend(
            self.requests
                .lock()
                .unwrap()
                .keys()
                .map(|pr| entry(MessageKind::Request, *pr)),
        );
        entries.extend(
            self.acks
                .lock()
                .unwrap()
                .keys()
                .map(|pr| entry(MessageKind::Ack, *pr)),
        );
        entries.extend(
            self.results
                .lock()
                .unwrap()
                .keys()
                .map(|pr| entry(MessageKind::Result, *pr)),
        );
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
