// Document Store - state document, event log, alert log
//
// The state document is the single source of truth for the handoff; the two
// logs are append-only side channels read by operators and other tools.

pub mod document_store;
pub mod lock;
pub mod types;

pub use document_store::{DocumentLayout, DocumentStore, StoreError};
pub use lock::{StateGuard, StateLock};
pub use types::{
    Alert, AlertLevel, ExecutorState, ExecutorStatus, FallbackJustification, HandoffEvent,
    MonitorRun, SlaCondition,
};
