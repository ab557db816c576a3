pub mod benchmark;
pub mod config;
pub mod error;
pub mod io;
pub mod kinds;
pub mod orchestrator;
pub mod paths;
pub mod registry;
pub mod sample;
pub mod shell;
pub mod stage;
pub mod timer;

#[cfg(test)]
mod testing;

pub use benchmark::{Benchmark, SortieContext, SortieOutcome, SortieRunner};
pub use error::{Result, SortieError};
pub use orchestrator::{OrchestratorState, RunOutcome, RunReport, SortieOrchestrator};
pub use registry::SortiePlan;
pub use sample::Sample;
pub use stage::{Stage, StageConfig};
