use std::path::PathBuf;
use thiserror::Error;

/// A cleanup call that failed during a best-effort cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SortieError {
    #[error("prepare failed for benchmark '{name}'")]
    Prepare {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("cleanup failed for {} benchmark(s): {}", .failures.len(), cleanup_names(.failures))]
    Cleanup { failures: Vec<CleanupFailure> },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid stage: {0:?}")]
    InvalidStage(String),

    #[error("invalid benchmark name '{0}': must be lowercase alphanumeric with '-' or '_'")]
    InvalidName(String),

    #[error("sortie {sortie} references unknown benchmark '{name}'")]
    UnknownBenchmark { sortie: usize, name: String },

    #[error("plan file not found: {}", .0.display())]
    PlanNotFound(PathBuf),

    #[error("no 'sh' found on PATH; shell benchmarks cannot run")]
    NoShell,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn cleanup_names(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.name, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SortieError>;
