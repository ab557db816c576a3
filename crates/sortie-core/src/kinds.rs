//! Benchmark kinds selected by the plan file, and the runner that executes a
//! sortie of them.
//!
//! Every member of a sortie runs at the same time on its own thread, so the
//! group shares one wall-clock window. Command output is logged, never parsed.

use crate::benchmark::{Benchmark, SortieContext, SortieOutcome, SortieRunner};
use crate::config::{BenchmarkDef, BenchmarkKind, ResourcePool};
use crate::error::{Result, SortieError};
use crate::sample::Sample;
use crate::shell::{find_shell, ShellCommand, ShellOutput};
use crate::stage::Stage;
use crate::timer::IntervalTimer;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// ConfiguredBenchmark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfiguredBenchmark {
    def: BenchmarkDef,
    workdir: PathBuf,
    sample_name: Option<String>,
    resources: ResourcePool,
}

impl ConfiguredBenchmark {
    pub fn new(def: BenchmarkDef, workdir: &Path) -> Self {
        Self {
            def,
            workdir: workdir.to_path_buf(),
            sample_name: None,
            resources: ResourcePool::default(),
        }
    }

    fn label(&self) -> &str {
        self.sample_name.as_deref().unwrap_or(&self.def.name)
    }

    fn command(&self, script: &str, timeout_seconds: u64) -> ShellCommand {
        let timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
        ShellCommand::new(script)
            .current_dir(&self.workdir)
            .env("SORTIE_BENCHMARK", self.def.name.as_str())
            .env("SORTIE_SAMPLE_NAME", self.label())
            .env("SORTIE_HOSTS", self.resources.hosts.join(","))
            .timeout(timeout)
    }

    /// Run an optional prepare/cleanup hook, timed under `<name>_<phase>`.
    fn hook(
        &self,
        phase: &str,
        script: Option<&str>,
        timeout_seconds: u64,
        timer: &mut IntervalTimer,
    ) -> anyhow::Result<()> {
        let Some(script) = script.filter(|s| !s.trim().is_empty()) else {
            return Ok(());
        };
        let cmd = self.command(script, timeout_seconds);
        let out = timer.measure(format!("{}_{phase}", self.def.name), || cmd.run());
        debug!(benchmark = %self.def.name, phase, code = out.code, "{}", out.output);
        if !out.success() {
            anyhow::bail!(
                "{phase} command for '{}' exited with status {}: {}",
                self.def.name,
                out.code,
                out.output
            );
        }
        Ok(())
    }

    /// Execute this member's run step for one sortie.
    pub fn run_once(&self, shell: &Path, ctx: &SortieContext) -> MemberRun {
        let output = match &self.def.kind {
            BenchmarkKind::Noop => ShellOutput {
                code: 0,
                timed_out: false,
                output: String::new(),
                elapsed: Duration::ZERO,
            },
            BenchmarkKind::Shell {
                run,
                timeout_seconds,
                ..
            } => self
                .command(run, *timeout_seconds)
                .shell(shell)
                .env("SORTIE_RUN_ID", ctx.run_id.to_string())
                .env("SORTIE_SORTIE", ctx.position.to_string())
                .run(),
        };
        MemberRun {
            name: self.def.name.clone(),
            sample_name: self.label().to_string(),
            output,
        }
    }
}

impl Benchmark for ConfiguredBenchmark {
    type Resources = ResourcePool;

    fn name(&self) -> &str {
        &self.def.name
    }

    fn sample_name(&self) -> Option<&str> {
        self.sample_name.as_deref()
    }

    fn set_sample_name(&mut self, sample_name: String) {
        self.sample_name = Some(sample_name);
    }

    fn set_resources(&mut self, resources: ResourcePool) {
        self.resources = resources;
    }

    fn prepare(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()> {
        match &self.def.kind {
            BenchmarkKind::Shell {
                prepare,
                timeout_seconds,
                ..
            } => self.hook("prepare", prepare.as_deref(), *timeout_seconds, timer),
            BenchmarkKind::Noop => Ok(()),
        }
    }

    fn cleanup(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()> {
        match &self.def.kind {
            BenchmarkKind::Shell {
                cleanup,
                timeout_seconds,
                ..
            } => self.hook("cleanup", cleanup.as_deref(), *timeout_seconds, timer),
            BenchmarkKind::Noop => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemberRun
// ---------------------------------------------------------------------------

/// One member's result within a sortie.
#[derive(Debug, Clone)]
pub struct MemberRun {
    pub name: String,
    pub sample_name: String,
    pub output: ShellOutput,
}

impl MemberRun {
    fn crashed(bm: &ConfiguredBenchmark) -> Self {
        Self {
            name: bm.def.name.clone(),
            sample_name: bm.label().to_string(),
            output: ShellOutput {
                code: 1,
                timed_out: false,
                output: "runner thread panicked".to_string(),
                elapsed: Duration::ZERO,
            },
        }
    }

    pub fn to_sample(&self, ctx: &SortieContext) -> Sample {
        Sample::new(
            format!("{}_runtime", self.sample_name),
            self.output.elapsed.as_secs_f64(),
            "s",
        )
        .with_meta("benchmark", self.name.as_str())
        .with_meta("exit_code", self.output.code)
        .with_meta("timed_out", self.output.timed_out)
        .with_meta("sortie", ctx.position)
        .with_meta("run_id", ctx.run_id.to_string())
    }
}

// ---------------------------------------------------------------------------
// ShellSortieRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShellSortieRunner {
    shell: PathBuf,
}

impl ShellSortieRunner {
    /// Fails with `NoShell` when `sh` is not on PATH.
    pub fn new() -> Result<Self> {
        let shell = find_shell().ok_or(SortieError::NoShell)?;
        Ok(Self { shell })
    }

    /// Use `shell` instead of the `sh` found on PATH.
    pub fn with_shell(shell: &Path) -> Self {
        Self {
            shell: shell.to_path_buf(),
        }
    }
}

impl SortieRunner<ConfiguredBenchmark> for ShellSortieRunner {
    fn run_sortie(&mut self, sortie: &[ConfiguredBenchmark], ctx: &SortieContext) -> SortieOutcome {
        if !ctx.stages.contains(&Stage::Run) {
            info!(sortie = ctx.position, "run stage not active; skipping sortie");
            return SortieOutcome::success();
        }

        let shell = self.shell.as_path();
        let runs: Vec<MemberRun> = std::thread::scope(|scope| {
            let handles: Vec<_> = sortie
                .iter()
                .map(|bm| scope.spawn(move || bm.run_once(shell, ctx)))
                .collect();
            handles
                .into_iter()
                .zip(sortie)
                .map(|(handle, bm)| handle.join().unwrap_or_else(|_| MemberRun::crashed(bm)))
                .collect()
        });

        for run in &runs {
            if run.output.success() {
                debug!(benchmark = %run.name, sortie = ctx.position, "{}", run.output.output);
            } else {
                warn!(
                    benchmark = %run.name,
                    sortie = ctx.position,
                    code = run.output.code,
                    "run failed: {}",
                    run.output.output
                );
            }
        }

        let status = runs
            .iter()
            .map(|r| r.output.code)
            .find(|code| *code != 0)
            .unwrap_or(0);
        let samples = runs.iter().map(|r| r.to_sample(ctx)).collect();
        SortieOutcome { status, samples }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
