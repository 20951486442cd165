use chrono::{DateTime, Utc};
use std::fmt;

use crate::store::ExecutorState;

/// Stages of one poll-loop tick, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    Heartbeat,
    AckScan,
    ResultScan,
    SlaEvaluation,
    Persist,
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TickStage::Heartbeat => "heartbeat",
            TickStage::AckScan => "ack-scan",
            TickStage::ResultScan => "result-scan",
            TickStage::SlaEvaluation => "sla-evaluation",
            TickStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Gated off: executor not blocked, or nothing left to consume
    Skipped,
    Completed { alerts: usize, events: usize },
    /// The stage's state changes were discarded; later stages still ran
    Failed { error: String },
}

impl StageOutcome {
    pub(crate) fn quiet() -> Self {
        StageOutcome::Completed {
            alerts: 0,
            events: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

/// What one tick did, stage by stage
#[derive(Debug, Clone)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub correlation_id: String,
    pub stages: Vec<(TickStage, StageOutcome)>,
    /// State as committed at the end of the tick
    pub state: ExecutorState,
}

impl TickReport {
    pub(crate) fn new(started_at: DateTime<Utc>, correlation_id: String, state: ExecutorState) -> Self {
        Self {
            started_at,
            correlation_id,
            stages: Vec::with_capacity(5),
            state,
        }
    }

    pub(crate) fn record(&mut self, stage: TickStage, outcome: StageOutcome) {
        self.stages.push((stage, outcome));
    }

    pub fn outcome(&self, stage: TickStage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(|(_, outcome)| outcome.is_failed())
    }

    pub fn alerts_raised(&self) -> usize {
        self.stages
            .iter()
            .map(|(_, outcome)| match outcome {
                StageOutcome::Completed { alerts, .. } => *alerts,
                _ => 0,
            })
            .sum()
    }
}
