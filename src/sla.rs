//! SLA timeout evaluation
//!
//! Rules 1 and 2 (ACK and RESULT timeouts) are level conditions: they hold on
//! every tick until the auditor catches up. By default each condition alerts
//! once per request, tracked in `ExecutorState::raised_alerts`;
//! `repeat_timeout_alerts` turns every tick into a reminder instead.
//!
//! Rule 3 (fallback) is edge-triggered through `fallback_ready`: it flips at
//! most once per request lifecycle.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::SlaThresholds;
use crate::store::{
    Alert, AlertLevel, ExecutorState, FallbackJustification, SlaCondition,
};

/// Alerts and the fallback record produced by one evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaOutcome {
    pub alerts: Vec<Alert>,
    pub fallback: Option<FallbackJustification>,
}

impl SlaOutcome {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.fallback.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct SlaEvaluator {
    defaults: SlaThresholds,
    repeat_timeout_alerts: bool,
}

fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since).num_minutes()
}

/// Budgets beyond `i64::MAX` minutes never expire
pub(crate) fn budget_minutes(minutes: u64) -> i64 {
    i64::try_from(minutes).unwrap_or(i64::MAX)
}

impl SlaEvaluator {
    pub fn new(defaults: SlaThresholds, repeat_timeout_alerts: bool) -> Self {
        Self {
            defaults,
            repeat_timeout_alerts,
        }
    }

    /// Apply the timeout rules to `state` as of `now`
    ///
    /// Does nothing unless the executor is BLOCKED on a PR. Mutates only
    /// `raised_alerts` and the fallback fields.
    pub fn evaluate(&self, state: &mut ExecutorState, now: DateTime<Utc>) -> SlaOutcome {
        let mut outcome = SlaOutcome::default();
        let Some(pr) = state.blocked_on() else {
            return outcome;
        };
        let thresholds = state.thresholds(&self.defaults);

        if let (Some(requested), None) = (state.request_created_at, state.ack_received_at) {
            let waited = elapsed_minutes(requested, now);
            if waited > budget_minutes(thresholds.ack_minutes)
                && self.should_raise(state, SlaCondition::AckTimeout)
            {
                outcome.alerts.push(Alert::new(
                    AlertLevel::N1,
                    format!(
                        "TIMEOUT: ACK not received for PR {pr} after {}m (waited {waited}m)",
                        thresholds.ack_minutes
                    ),
                ));
            }
        }

        if let (Some(acked), None) = (state.ack_received_at, state.result_received_at) {
            let waited = elapsed_minutes(acked, now);
            if waited > budget_minutes(thresholds.result_minutes)
                && self.should_raise(state, SlaCondition::ResultTimeout)
            {
                outcome.alerts.push(Alert::new(
                    AlertLevel::N2,
                    format!(
                        "TIMEOUT: RESULT not received for PR {pr} after {}m (waited {waited}m)",
                        thresholds.result_minutes
                    ),
                ));
            }
        }

        if let (Some(requested), None) = (state.request_created_at, state.result_received_at) {
            let waited = elapsed_minutes(requested, now);
            if waited >= budget_minutes(thresholds.fallback_minutes) && !state.fallback_ready {
                state.fallback_ready = true;
                state.fallback_since = Some(now);

                info!(
                    pr = %pr,
                    elapsed_minutes = %waited,
                    threshold_minutes = %thresholds.fallback_minutes,
                    "Fallback path opened"
                );

                outcome.alerts.push(Alert::new(
                    AlertLevel::Crit,
                    format!(
                        "FALLBACK READY for PR {pr}: no audit result after {waited}m (threshold {}m). Manual approval required before merge.",
                        thresholds.fallback_minutes
                    ),
                ));
                outcome.fallback = Some(FallbackJustification {
                    pr_number: pr,
                    request_id: state.pending_request_id.clone(),
                    elapsed_minutes: waited,
                    threshold_minutes: thresholds.fallback_minutes,
                    generated_at: now,
                });
            }
        }

        outcome
    }

    /// Record the condition; true when an alert should go out this tick
    fn should_raise(&self, state: &mut ExecutorState, condition: SlaCondition) -> bool {
        if state.raised_alerts.contains(&condition) {
            return self.repeat_timeout_alerts;
        }
        state.raised_alerts.push(condition);
        true
    }
}
