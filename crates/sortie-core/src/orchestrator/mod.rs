//! Sortie orchestrator.
//!
//! Drives prepare, run and cleanup across a `SortiePlan`:
//!
//! - prepare: assign `sample_name` and resources to every instance, then
//!   prepare each distinct benchmark once, in first-seen order.
//! - run: narrow the caller's `StageConfig` to the run phase, execute sorties
//!   in plan order and stop at the first non-zero status. The stage
//!   configuration is restored on every exit path.
//! - cleanup: clean up each distinct benchmark once, only while the `cleanup`
//!   stage is active.
//!
//! Transitions: `Idle → Preparing → Running → Completed | Aborted → CleaningUp → Idle`

mod executor;
mod state;

pub use executor::{SortieOrchestrator, DEFAULT_SAMPLE_PREFIX};
pub use state::{OrchestratorState, RunOutcome, RunReport};
