use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrchestratorState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    /// Prepare is in progress, or finished cleanly and waits for `run` or
    /// `cleanup`.
    Preparing,
    /// A prepare call failed. Only `cleanup` is accepted, and it touches
    /// only the benchmarks prepare reached.
    PrepareFailed,
    Running,
    Completed,
    Aborted,
    CleaningUp,
}

impl OrchestratorState {
    pub fn as_str(self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Preparing => "preparing",
            OrchestratorState::PrepareFailed => "prepare_failed",
            OrchestratorState::Running => "running",
            OrchestratorState::Completed => "completed",
            OrchestratorState::Aborted => "aborted",
            OrchestratorState::CleaningUp => "cleaning_up",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunOutcome / RunReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every sortie returned status 0.
    Completed,
    /// `sortie` returned a non-zero `status`; later sorties never ran.
    Aborted { sortie: usize, status: i32 },
}

/// Result of the run phase.
///
/// `samples` keeps the stream contract (`overall_end` is present only when
/// every sortie completed); `outcome` states the same thing explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub samples: Vec<Sample>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Metric names in emission order.
    pub fn metrics(&self) -> Vec<&str> {
        self.samples.iter().map(Sample::metric).collect()
    }
}
