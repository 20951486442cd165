use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::inbox::{AuditAck, AuditResult, Verdict};
use crate::store::{Alert, AlertLevel, ExecutorState, ExecutorStatus, HandoffEvent};

/// Why a transition did not apply
///
/// Guard failures are not errors: the caller treats them as a no-op for the
/// current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardFailure {
    NotReady { pending_pr: Option<u64> },
    NotBlocked,
    PrMismatch { pending: Option<u64>, message: u64 },
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Applied {
        previous: ExecutorStatus,
        current: ExecutorStatus,
        events: Vec<HandoffEvent>,
        alerts: Vec<Alert>,
    },
    Ignored(GuardFailure),
}

impl TransitionResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionResult::Applied { .. })
    }

    pub fn events(&self) -> &[HandoffEvent] {
        match self {
            TransitionResult::Applied { events, .. } => events,
            TransitionResult::Ignored(_) => &[],
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        match self {
            TransitionResult::Applied { alerts, .. } => alerts,
            TransitionResult::Ignored(_) => &[],
        }
    }
}

/// Guarded READY/BLOCKED transitions over the state document
///
/// Each transition mutates `state` in place only when its guard passes and
/// returns the events and alerts the caller must append.
pub struct HandoffMachine;

impl HandoffMachine {
    /// READY -> BLOCKED on a new review request
    pub fn submit_request(
        state: &mut ExecutorState,
        pr: u64,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> TransitionResult {
        if state.state != ExecutorStatus::Ready {
            warn!(
                pr = %pr,
                pending_pr = ?state.pending_pr,
                "Submit ignored: executor already blocked"
            );
            return TransitionResult::Ignored(GuardFailure::NotReady {
                pending_pr: state.pending_pr,
            });
        }

        state.state = ExecutorStatus::Blocked;
        state.pending_pr = Some(pr);
        state.pending_request_id = Some(request_id.to_string());
        state.request_created_at = Some(now);
        state.ack_received_at = None;
        state.result_received_at = None;
        state.fallback_ready = false;
        state.fallback_since = None;
        state.raised_alerts.clear();

        info!(pr = %pr, request_id = %request_id, "Executor blocked pending audit");

        TransitionResult::Applied {
            previous: ExecutorStatus::Ready,
            current: ExecutorStatus::Blocked,
            events: vec![HandoffEvent::AuditRequestSubmitted {
                timestamp: now,
                pr_number: pr,
                request_id: request_id.to_string(),
            }],
            alerts: Vec::new(),
        }
    }

    /// Record the auditor's acknowledgement; the ack's own timestamp is kept
    pub fn receive_ack(
        state: &mut ExecutorState,
        ack: &AuditAck,
        now: DateTime<Utc>,
    ) -> TransitionResult {
        if let Err(guard) = Self::check_pending(state, ack.pr_number) {
            return TransitionResult::Ignored(guard);
        }
        if state.ack_received_at.is_some() {
            return TransitionResult::Ignored(GuardFailure::AlreadyApplied);
        }

        state.ack_received_at = Some(ack.timestamp);

        info!(
            pr = %ack.pr_number,
            status = ?ack.status,
            acknowledged_at = %ack.timestamp,
            "Audit acknowledgement received"
        );

        TransitionResult::Applied {
            previous: ExecutorStatus::Blocked,
            current: ExecutorStatus::Blocked,
            events: vec![HandoffEvent::AuditAckReceived {
                timestamp: now,
                pr_number: ack.pr_number,
                ack_type: ack.ack_type.clone(),
                status: ack.status.clone(),
                acknowledged_at: ack.timestamp,
            }],
            alerts: Vec::new(),
        }
    }

    /// Record the auditor's verdict and unblock on approval
    pub fn receive_result(
        state: &mut ExecutorState,
        result: &AuditResult,
        now: DateTime<Utc>,
    ) -> TransitionResult {
        if let Err(guard) = Self::check_pending(state, result.pr_number) {
            return TransitionResult::Ignored(guard);
        }
        if state.result_received_at.is_some() {
            return TransitionResult::Ignored(GuardFailure::AlreadyApplied);
        }

        let pr = result.pr_number;
        state.result_received_at = Some(result.timestamp);

        let mut events = vec![HandoffEvent::AuditResultReceived {
            timestamp: now,
            pr_number: pr,
            verdict: result.verdict,
            executor_unblock: result.executor_unblock,
            completed_at: result.timestamp,
        }];
        let mut alerts = Vec::new();

        info!(
            pr = %pr,
            verdict = %result.verdict,
            executor_unblock = %result.executor_unblock,
            "Audit result received"
        );

        match result.verdict {
            Verdict::Approved if result.executor_unblock => {
                state.state = ExecutorStatus::Ready;
                state.pending_pr = None;
                state.pending_request_id = None;
                state.fallback_ready = false;
                state.fallback_since = None;
                state.raised_alerts.clear();
                events.push(HandoffEvent::ExecutorUnblocked {
                    timestamp: now,
                    pr_number: pr,
                });
                info!(pr = %pr, "Executor unblocked");
            }
            Verdict::Approved => {
                warn!(pr = %pr, "Approved without executor_unblock; executor stays blocked");
            }
            Verdict::Rejected => {
                alerts.push(Alert::new(
                    AlertLevel::Crit,
                    format!("PR {pr} REJECTED by auditor; executor remains BLOCKED until an operator intervenes"),
                ));
            }
            Verdict::ReviewPending => {}
        }

        TransitionResult::Applied {
            previous: ExecutorStatus::Blocked,
            current: state.state,
            events,
            alerts,
        }
    }

    fn check_pending(state: &ExecutorState, message_pr: u64) -> Result<(), GuardFailure> {
        if state.state != ExecutorStatus::Blocked {
            return Err(GuardFailure::NotBlocked);
        }
        if state.pending_pr != Some(message_pr) {
            return Err(GuardFailure::PrMismatch {
                pending: state.pending_pr,
                message: message_pr,
            });
        }
        Ok(())
    }
}
