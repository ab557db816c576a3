//! Collaborator interfaces the orchestrator drives.
//!
//! A `Benchmark` owns its own setup and teardown. Running is done per sortie
//! by a `SortieRunner`, which sees the whole group at once so members can
//! share a resource pool and a wall-clock window.

use crate::sample::Sample;
use crate::stage::StageConfig;
use crate::timer::IntervalTimer;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait Benchmark {
    /// Handle assigned to every instance before prepare (e.g. a host pool).
    type Resources: Clone;

    /// Identity used for dedup across sorties.
    fn name(&self) -> &str;

    fn sample_name(&self) -> Option<&str>;

    fn set_sample_name(&mut self, sample_name: String);

    fn set_resources(&mut self, resources: Self::Resources);

    fn prepare(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()>;

    fn cleanup(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()>;
}

/// `<prefix>_<name>`, the label a benchmark's samples are namespaced under.
pub fn sample_name(prefix: &str, name: &str) -> String {
    format!("{prefix}_{name}")
}

// ---------------------------------------------------------------------------
// SortieContext / SortieOutcome
// ---------------------------------------------------------------------------

/// What a runner is told about the sortie it is executing.
#[derive(Debug, Clone)]
pub struct SortieContext {
    pub run_id: Uuid,
    /// Zero-based position of the sortie in the plan.
    pub position: usize,
    pub started_at: DateTime<Utc>,
    /// The narrowed stage configuration in effect during the run phase.
    pub stages: StageConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SortieOutcome {
    /// `0` on success. Anything else aborts the remaining plan.
    pub status: i32,
    pub samples: Vec<Sample>,
}

impl SortieOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(status: i32) -> Self {
        Self {
            status,
            samples: Vec::new(),
        }
    }

    pub fn with_samples(mut self, samples: Vec<Sample>) -> Self {
        self.samples = samples;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

// ---------------------------------------------------------------------------
// SortieRunner
// ---------------------------------------------------------------------------

pub trait SortieRunner<B: Benchmark> {
    /// Execute every member of one sortie. Retries, if any, belong here.
    fn run_sortie(&mut self, sortie: &[B], ctx: &SortieContext) -> SortieOutcome;
}

impl<B, F> SortieRunner<B> for F
where
    B: Benchmark,
    F: FnMut(&[B], &SortieContext) -> SortieOutcome,
{
    fn run_sortie(&mut self, sortie: &[B], ctx: &SortieContext) -> SortieOutcome {
        self(sortie, ctx)
    }
}
