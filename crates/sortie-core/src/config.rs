use crate::error::{Result, SortieError};
use crate::kinds::ConfiguredBenchmark;
use crate::orchestrator::DEFAULT_SAMPLE_PREFIX;
use crate::paths;
use crate::registry::SortiePlan;
use crate::stage::{Stage, StageConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BenchmarkKind / BenchmarkDef
// ---------------------------------------------------------------------------

/// How a declared benchmark is carried out. Selected by the `kind` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchmarkKind {
    Shell {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prepare: Option<String>,
        #[serde(default)]
        run: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleanup: Option<String>,
        /// Per command. `0` disables the timeout.
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
    },
    Noop,
}

fn default_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: BenchmarkKind,
}

impl BenchmarkDef {
    pub fn noop(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: BenchmarkKind::Noop,
        }
    }

    pub fn shell(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: BenchmarkKind::Shell {
                prepare: None,
                run: run.into(),
                cleanup: None,
                timeout_seconds: default_timeout(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ResourcePool
// ---------------------------------------------------------------------------

/// Opaque machines handed to every benchmark. Never provisioned here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    #[serde(default)]
    pub hosts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Plan (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_sample_prefix")]
    pub sample_prefix: String,
    #[serde(default)]
    pub run_stages: StageConfig,
    #[serde(default)]
    pub resources: ResourcePool,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkDef>,
    #[serde(default)]
    pub sorties: Vec<Vec<String>>,
}

fn default_version() -> u32 {
    1
}

fn default_sample_prefix() -> String {
    DEFAULT_SAMPLE_PREFIX.to_string()
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            version: default_version(),
            sample_prefix: default_sample_prefix(),
            run_stages: StageConfig::default(),
            resources: ResourcePool::default(),
            benchmarks: Vec::new(),
            sorties: Vec::new(),
        }
    }
}

impl Plan {
    /// The plan written by `sortie init`.
    pub fn starter() -> Self {
        let mut warm = BenchmarkDef::shell("warm-cache", "sleep 1");
        if let BenchmarkKind::Shell { prepare, .. } = &mut warm.kind {
            *prepare = Some("echo preparing $SORTIE_BENCHMARK on $SORTIE_HOSTS".to_string());
        }
        Self {
            resources: ResourcePool {
                hosts: vec!["localhost".to_string()],
            },
            benchmarks: vec![warm, BenchmarkDef::noop("idle")],
            sorties: vec![
                vec!["warm-cache".to_string(), "idle".to_string()],
                vec!["warm-cache".to_string()],
            ],
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SortieError::PlanNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::io::atomic_write(path, self.to_yaml()?.as_bytes())
    }

    pub fn find(&self, name: &str) -> Option<&BenchmarkDef> {
        self.benchmarks.iter().find(|b| b.name == name)
    }

    /// Instantiate one `ConfiguredBenchmark` per sortie slot. Shell commands
    /// run in `workdir`.
    pub fn build(&self, workdir: &Path) -> Result<SortiePlan<ConfiguredBenchmark>> {
        let mut sorties = Vec::with_capacity(self.sorties.len());
        for (i, members) in self.sorties.iter().enumerate() {
            let mut sortie = Vec::with_capacity(members.len());
            for name in members {
                let def = self.find(name).ok_or_else(|| SortieError::UnknownBenchmark {
                    sortie: i,
                    name: name.clone(),
                })?;
                sortie.push(ConfiguredBenchmark::new(def.clone(), workdir));
            }
            sorties.push(sortie);
        }
        Ok(SortiePlan::new(sorties))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let warn = |level: WarnLevel, message: String| ConfigWarning { level, message };

        if self.sample_prefix.trim().is_empty() {
            warnings.push(warn(WarnLevel::Warning, "sample_prefix is empty".to_string()));
        }

        // 1. Declarations: names, duplicates, empty run commands
        let mut declared: HashMap<&str, usize> = HashMap::new();
        for def in &self.benchmarks {
            *declared.entry(def.name.as_str()).or_insert(0) += 1;
            if let Err(e) = paths::validate_name(&def.name) {
                warnings.push(warn(WarnLevel::Warning, e.to_string()));
            }
            if let BenchmarkKind::Shell { run, .. } = &def.kind {
                if run.trim().is_empty() {
                    warnings.push(warn(
                        WarnLevel::Warning,
                        format!("benchmark '{}' has an empty run command", def.name),
                    ));
                }
            }
        }
        let mut duplicates: Vec<&str> = declared
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(name, _)| *name)
            .collect();
        duplicates.sort();
        for name in duplicates {
            warnings.push(warn(
                WarnLevel::Error,
                format!("benchmark '{name}' is declared more than once"),
            ));
        }

        // 2. Sorties: empty, unknown members
        if self.sorties.is_empty() {
            warnings.push(warn(WarnLevel::Warning, "plan has no sorties".to_string()));
        }
        let mut used: HashSet<&str> = HashSet::new();
        for (i, members) in self.sorties.iter().enumerate() {
            if members.is_empty() {
                warnings.push(warn(WarnLevel::Warning, format!("sortie {i} is empty")));
            }
            for name in members {
                used.insert(name.as_str());
                if !declared.contains_key(name.as_str()) {
                    warnings.push(warn(
                        WarnLevel::Error,
                        format!("sortie {i} references unknown benchmark '{name}'"),
                    ));
                }
            }
        }

        // 3. Declared but never scheduled
        for def in &self.benchmarks {
            if !used.contains(def.name.as_str()) {
                warnings.push(warn(
                    WarnLevel::Warning,
                    format!("benchmark '{}' is not used by any sortie", def.name),
                ));
            }
        }

        // 4. Stages
        for name in self.run_stages.unknown() {
            warnings.push(warn(
                WarnLevel::Warning,
                format!("unknown stage '{name}' in run_stages"),
            ));
        }
        if !self.run_stages.contains(&Stage::Run) {
            warnings.push(warn(
                WarnLevel::Warning,
                "run_stages does not include 'run'; sorties will not execute".to_string(),
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
