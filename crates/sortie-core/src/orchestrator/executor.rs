use super::state::{OrchestratorState, RunOutcome, RunReport};
use crate::benchmark::{sample_name, Benchmark, SortieContext, SortieRunner};
use crate::error::{CleanupFailure, Result, SortieError};
use crate::registry::SortiePlan;
use crate::sample::Sample;
use crate::stage::{RunStageGuard, Stage, StageConfig};
use crate::timer::IntervalTimer;
use chrono::Utc;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_SAMPLE_PREFIX: &str = "parallel";

pub struct SortieOrchestrator<B: Benchmark, R> {
    plan: SortiePlan<B>,
    runner: R,
    resources: B::Resources,
    sample_prefix: String,
    run_id: Uuid,
    state: OrchestratorState,
    /// Unique benchmarks whose prepare was invoked before a failure, the
    /// failing one included. `None` when prepare did not fail.
    reached: Option<usize>,
}

impl<B, R> SortieOrchestrator<B, R>
where
    B: Benchmark,
    R: SortieRunner<B>,
{
    pub fn new(plan: SortiePlan<B>, runner: R, resources: B::Resources) -> Self {
        Self {
            plan,
            runner,
            resources,
            sample_prefix: DEFAULT_SAMPLE_PREFIX.to_string(),
            run_id: Uuid::new_v4(),
            state: OrchestratorState::Idle,
            reached: None,
        }
    }

    pub fn with_sample_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sample_prefix = prefix.into();
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn plan(&self) -> &SortiePlan<B> {
        &self.plan
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn transition(&mut self, allowed: &[OrchestratorState], to: OrchestratorState) -> Result<()> {
        if !allowed.contains(&self.state) {
            return Err(SortieError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // prepare
    // -----------------------------------------------------------------------

    /// Label and equip every instance, then prepare each distinct benchmark
    /// once. The first prepare error aborts the phase and leaves the
    /// orchestrator in `PrepareFailed`, where `run` is refused.
    ///
    /// Returns the timer shared by all prepare calls. No samples are emitted.
    pub fn prepare(&mut self) -> Result<IntervalTimer> {
        self.transition(&[OrchestratorState::Idle], OrchestratorState::Preparing)?;

        for bm in self.plan.sub_benchmarks_mut(false) {
            let label = sample_name(&self.sample_prefix, bm.name());
            bm.set_sample_name(label);
            bm.set_resources(self.resources.clone());
        }

        let mut timer = IntervalTimer::new();
        for (i, bm) in self.plan.sub_benchmarks_mut(true).enumerate() {
            debug!(benchmark = bm.name(), "prepare");
            if let Err(e) = bm.prepare(&mut timer) {
                warn!(benchmark = bm.name(), "prepare failed: {e:#}");
                self.state = OrchestratorState::PrepareFailed;
                self.reached = Some(i + 1);
                return Err(SortieError::Prepare {
                    name: bm.name().to_string(),
                    source: e.into(),
                });
            }
        }
        info!(
            run_id = %self.run_id,
            unique = self.plan.unique_sub_benchmarks().count(),
            "prepare complete"
        );
        Ok(timer)
    }

    // -----------------------------------------------------------------------
    // run
    // -----------------------------------------------------------------------

    /// Execute sorties in plan order with `stages` narrowed to the run phase.
    ///
    /// A non-zero sortie status stops the plan: `overall_end` is not emitted
    /// and the report's outcome is `Aborted`. `stages` is restored before
    /// this returns either way.
    pub fn run(&mut self, stages: &mut StageConfig) -> Result<RunReport> {
        self.transition(&[OrchestratorState::Preparing], OrchestratorState::Running)?;

        let run_id = self.run_id;
        let guard = RunStageGuard::narrow(stages);
        let mut samples = vec![bookkeeping("overall_start", 0.0, "s", run_id)
            .with_meta("sorties", json!(self.plan.manifest()))];
        let mut outcome = RunOutcome::Completed;

        for (position, sortie) in self.plan.sorties().iter().enumerate() {
            let members: Vec<&str> = sortie.iter().map(|b| b.name()).collect();
            samples.push(
                bookkeeping("sortie_start", position as f64, "index", run_id)
                    .with_meta("members", json!(members)),
            );

            let ctx = SortieContext {
                run_id,
                position,
                started_at: Utc::now(),
                stages: guard.active().clone(),
            };
            info!(sortie = position, members = ?members, "sortie start");
            let clock = Instant::now();
            let result = self.runner.run_sortie(sortie, &ctx);
            let elapsed = clock.elapsed();

            samples.extend(result.samples);
            samples.push(
                bookkeeping("sortie_end", position as f64, "index", run_id)
                    .with_meta("members", json!(members))
                    .with_meta("status", result.status)
                    .with_meta("duration_s", elapsed.as_secs_f64()),
            );

            if result.status != 0 {
                warn!(
                    sortie = position,
                    status = result.status,
                    "sortie failed; skipping remaining sorties"
                );
                outcome = RunOutcome::Aborted {
                    sortie: position,
                    status: result.status,
                };
                break;
            }
        }

        if outcome == RunOutcome::Completed {
            samples.push(bookkeeping("overall_end", 0.0, "s", run_id));
        }
        drop(guard);

        self.state = match outcome {
            RunOutcome::Completed => OrchestratorState::Completed,
            RunOutcome::Aborted { .. } => OrchestratorState::Aborted,
        };
        info!(run_id = %run_id, outcome = ?outcome, samples = samples.len(), "run complete");

        Ok(RunReport {
            run_id,
            outcome,
            samples,
        })
    }

    // -----------------------------------------------------------------------
    // cleanup
    // -----------------------------------------------------------------------

    /// Clean up each distinct benchmark once, if `stages` contains `cleanup`.
    /// After a failed prepare only the benchmarks prepare reached are cleaned.
    ///
    /// Every cleanup is attempted; failures are collected and returned
    /// together as `SortieError::Cleanup`.
    pub fn cleanup(&mut self, stages: &StageConfig) -> Result<IntervalTimer> {
        let limit = self.reached.unwrap_or(usize::MAX);
        self.transition(
            &[
                OrchestratorState::Preparing,
                OrchestratorState::PrepareFailed,
                OrchestratorState::Completed,
                OrchestratorState::Aborted,
            ],
            OrchestratorState::CleaningUp,
        )?;
        self.reached = None;

        let mut timer = IntervalTimer::new();
        let mut failures = Vec::new();

        if stages.contains(&Stage::Cleanup) {
            for bm in self.plan.sub_benchmarks_mut(true).take(limit) {
                debug!(benchmark = bm.name(), "cleanup");
                if let Err(e) = bm.cleanup(&mut timer) {
                    warn!(benchmark = bm.name(), "cleanup failed: {e:#}");
                    failures.push(CleanupFailure {
                        name: bm.name().to_string(),
                        message: format!("{e:#}"),
                    });
                }
            }
        } else {
            info!("cleanup stage not active; leaving benchmarks in place");
        }

        self.state = OrchestratorState::Idle;
        if failures.is_empty() {
            Ok(timer)
        } else {
            Err(SortieError::Cleanup { failures })
        }
    }

    /// prepare → run → cleanup. A prepare error returns immediately without
    /// running or cleaning up; an aborted run is still cleaned up.
    pub fn execute(&mut self, stages: &mut StageConfig) -> Result<RunReport> {
        self.prepare()?;
        let report = self.run(stages)?;
        self.cleanup(stages)?;
        Ok(report)
    }
}

fn bookkeeping(metric: &str, value: f64, unit: &str, run_id: Uuid) -> Sample {
    Sample::new(metric, value, unit).with_meta("run_id", run_id.to_string())
}
