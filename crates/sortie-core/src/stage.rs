//! Lifecycle stages and the stage configuration the orchestrator narrows
//! around its run phase.
//!
//! `StageConfig` is an explicit value owned by the caller. The orchestrator
//! borrows it mutably for the run phase, narrows it to the measurement stages
//! and puts it back exactly as found on every exit path (see `RunStageGuard`).

use crate::error::{Result, SortieError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    Provision,
    Prepare,
    Run,
    Cleanup,
    Teardown,
    /// A stage this crate does not know about. Carried through untouched.
    Other(String),
}

/// Stages removed when narrowing to the run phase.
pub const NON_RUN_STAGES: [Stage; 4] = [
    Stage::Provision,
    Stage::Prepare,
    Stage::Cleanup,
    Stage::Teardown,
];

impl Stage {
    pub fn all() -> Vec<Stage> {
        vec![
            Stage::Provision,
            Stage::Prepare,
            Stage::Run,
            Stage::Cleanup,
            Stage::Teardown,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Stage::Provision => "provision",
            Stage::Prepare => "prepare",
            Stage::Run => "run",
            Stage::Cleanup => "cleanup",
            Stage::Teardown => "teardown",
            Stage::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Stage::Other(_))
    }

    fn from_name(s: &str) -> Stage {
        match s {
            "provision" => Stage::Provision,
            "prepare" => Stage::Prepare,
            "run" => Stage::Run,
            "cleanup" => Stage::Cleanup,
            "teardown" => Stage::Teardown,
            other => Stage::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SortieError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(',') {
            return Err(SortieError::InvalidStage(s.to_string()));
        }
        Ok(Stage::from_name(s))
    }
}

impl TryFrom<String> for Stage {
    type Error = SortieError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// Ordered list of active stages. Order and duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StageSpec", into = "Vec<Stage>")]
pub struct StageConfig {
    stages: Vec<Stage>,
}

/// On-disk form: either the keyword / comma list, or a YAML sequence.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum StageSpec {
    Text(String),
    List(Vec<Stage>),
}

impl TryFrom<StageSpec> for StageConfig {
    type Error = SortieError;

    fn try_from(spec: StageSpec) -> Result<Self> {
        match spec {
            StageSpec::Text(s) => StageConfig::parse(&s),
            StageSpec::List(stages) => Ok(StageConfig::new(stages)),
        }
    }
}

impl From<StageConfig> for Vec<Stage> {
    fn from(config: StageConfig) -> Self {
        config.stages
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::new(Stage::all())
    }
}

impl StageConfig {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Parse `all` or a comma-separated list such as `prepare,run`.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim() == "all" {
            return Ok(Self::default());
        }
        let stages = s
            .split(',')
            .map(Stage::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(stages))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: &Stage) -> bool {
        self.stages.contains(stage)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Names of stages this crate does not recognize.
    pub fn unknown(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| !s.is_known())
            .map(Stage::as_str)
            .collect()
    }

    /// Narrow in place to the run phase and return the previous value.
    pub fn narrow_in_place(&mut self) -> StageConfig {
        let (filtered, original) = narrow(self);
        *self = filtered;
        original
    }

    /// Put back a value captured by `narrow` / `narrow_in_place`.
    pub fn restore(&mut self, original: StageConfig) {
        *self = original;
    }
}

impl fmt::Display for StageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(Stage::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Remove provision, prepare, cleanup and teardown (every occurrence, and
/// tolerating their absence). Returns `(filtered, original)`.
pub fn narrow(current: &StageConfig) -> (StageConfig, StageConfig) {
    let filtered: Vec<Stage> = current
        .stages
        .iter()
        .filter(|s| !NON_RUN_STAGES.contains(s))
        .cloned()
        .collect();
    (StageConfig::new(filtered), current.clone())
}

// ---------------------------------------------------------------------------
// RunStageGuard
// ---------------------------------------------------------------------------

/// Keeps a `StageConfig` narrowed for as long as the guard lives.
///
/// Dropping the guard restores the captured value, including when the run
/// phase returns early or unwinds.
pub struct RunStageGuard<'a> {
    stages: &'a mut StageConfig,
    original: Option<StageConfig>,
}

impl<'a> RunStageGuard<'a> {
    pub fn narrow(stages: &'a mut StageConfig) -> Self {
        let original = stages.narrow_in_place();
        tracing::info!("original run stages {} reduced to {}", original, stages);
        Self {
            stages,
            original: Some(original),
        }
    }

    /// The narrowed configuration currently in effect.
    pub fn active(&self) -> &StageConfig {
        self.stages
    }

    pub fn original(&self) -> Option<&StageConfig> {
        self.original.as_ref()
    }
}

impl Drop for RunStageGuard<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            tracing::info!("restoring run stages to {}", original);
            self.stages.restore(original);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
