use crate::cmd::plan::workdir;
use crate::output::{print_json, Table};
use anyhow::Context;
use sortie_core::{
    config::{Plan, WarnLevel},
    kinds::ShellSortieRunner,
    RunOutcome, Sample, SortieOrchestrator, StageConfig,
};
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// RunExit: typed non-zero exit codes
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunExit {
    SortieFailed { sortie: usize, status: i32 },
}

impl RunExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            // Process exit codes are a single byte; keep failures non-zero.
            RunExit::SortieFailed { status, .. } if (1..=255).contains(status) => *status,
            RunExit::SortieFailed { .. } => 1,
        }
    }
}

impl std::fmt::Display for RunExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunExit::SortieFailed { sortie, status } => {
                write!(f, "sortie {sortie} failed with status {status}")
            }
        }
    }
}

impl std::error::Error for RunExit {}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(path: &Path, run_stage: Option<&str>, json: bool) -> anyhow::Result<()> {
    let plan = Plan::load(path).context("failed to load plan")?;

    let errors: Vec<_> = plan
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .collect();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("[error] {}", e.message);
        }
        anyhow::bail!("plan has errors; see 'sortie validate'");
    }

    let mut stages = match run_stage {
        Some(s) => StageConfig::parse(s).context("invalid --run-stage")?,
        None => plan.run_stages.clone(),
    };
    let unknown = stages.unknown();
    if !unknown.is_empty() {
        warn!(stages = ?unknown, "unrecognized stages will be passed through");
    }

    let sorties = plan.build(&workdir(path))?;
    let runner = ShellSortieRunner::new()?;
    let mut orchestrator = SortieOrchestrator::new(sorties, runner, plan.resources.clone())
        .with_sample_prefix(plan.sample_prefix.clone());
    info!(
        run_id = %orchestrator.run_id(),
        sorties = orchestrator.plan().len(),
        stages = %stages,
        "starting run"
    );

    let prepare_timer = orchestrator.prepare().context("prepare failed")?;
    let report = orchestrator.run(&mut stages)?;
    let cleanup = orchestrator.cleanup(&stages);

    let mut samples = prepare_timer.generate_samples();
    samples.extend(report.samples.iter().cloned());
    if let Ok(timer) = &cleanup {
        samples.extend(timer.generate_samples());
    }

    if json {
        let value = serde_json::json!({
            "run_id": report.run_id,
            "outcome": report.outcome,
            "samples": samples,
        });
        print_json(&value)?;
    } else {
        print_samples(&samples);
        println!();
        match report.outcome {
            RunOutcome::Completed => {
                println!("Completed {} sortie(s).", orchestrator.plan().len())
            }
            RunOutcome::Aborted { sortie, status } => {
                println!("Aborted at sortie {sortie} (status {status}).")
            }
        }
    }

    // Samples are printed first so a failed cleanup never hides results.
    cleanup.context("cleanup failed")?;

    if let RunOutcome::Aborted { sortie, status } = report.outcome {
        return Err(RunExit::SortieFailed { sortie, status }.into());
    }
    Ok(())
}

fn print_samples(samples: &[Sample]) {
    let mut table = Table::new(&["METRIC", "VALUE", "UNIT", "TIME"]).align_right(1);
    for s in samples {
        table.row(vec![
            s.metric().to_string(),
            format!("{:.3}", s.value()),
            s.unit().to_string(),
            s.timestamp().format("%H:%M:%S%.3f").to_string(),
        ]);
    }
    table.print();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_is_sortie_status() {
        let exit = RunExit::SortieFailed {
            sortie: 1,
            status: 3,
        };
        assert_eq!(exit.exit_code(), 3);
        assert_eq!(exit.to_string(), "sortie 1 failed with status 3");
    }

    #[test]
    fn out_of_range_status_still_fails() {
        for status in [-1, 256, 1024] {
            let exit = RunExit::SortieFailed { sortie: 0, status };
            assert_eq!(exit.exit_code(), 1);
        }
    }

    #[test]
    fn run_exit_survives_anyhow() {
        let err: anyhow::Error = RunExit::SortieFailed {
            sortie: 0,
            status: 7,
        }
        .into();
        let exit = err.downcast_ref::<RunExit>().unwrap();
        assert_eq!(exit.exit_code(), 7);
    }
}
