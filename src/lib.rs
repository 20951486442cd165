// Audit Handoff Library - executor/auditor approval handoff
// This exposes the monitor components for the binary, tests and embedding

pub mod cli;
pub mod config;
pub mod fs;
pub mod handoff;
pub mod heartbeat;
pub mod inbox;
pub mod monitor;
pub mod shutdown;
pub mod sla;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{HandoffConfig, RunMode, SlaThresholds};
pub use fs::{FileSystemOperations, StandardFileSystem};
pub use handoff::{GuardFailure, HandoffMachine, TransitionResult};
pub use heartbeat::{Heartbeat, HeartbeatChecker, HeartbeatStatus};
pub use inbox::{
    AuditAck, AuditRequest, AuditResult, FileSystemInbox, Inbox, InboxError, MemoryInbox,
    MessageKind, Verdict,
};
pub use monitor::{HandoffMonitor, MonitorError, StageOutcome, TickReport, TickStage};
pub use shutdown::ShutdownCoordinator;
pub use sla::{SlaEvaluator, SlaOutcome};
pub use store::{
    Alert, AlertLevel, DocumentLayout, DocumentStore, ExecutorState, ExecutorStatus,
    HandoffEvent, StoreError,
};
pub use telemetry::{create_tick_span, generate_correlation_id, init_telemetry};
