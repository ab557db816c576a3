//! Recording fakes shared by the unit tests.

use crate::benchmark::{Benchmark, SortieContext, SortieOutcome, SortieRunner};
use crate::registry::SortiePlan;
use crate::timer::IntervalTimer;
use std::cell::RefCell;
use std::rc::Rc;

/// Ordered log of collaborator calls, e.g. `prepare:a`, `cleanup:b`.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Debug, Clone)]
pub struct FakeBenchmark {
    pub name: String,
    pub sample_name: Option<String>,
    pub resources: Option<Vec<String>>,
    pub fail_prepare: bool,
    pub fail_cleanup: bool,
    pub tag: usize,
    journal: Journal,
}

impl FakeBenchmark {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            sample_name: None,
            resources: None,
            fail_prepare: false,
            fail_cleanup: false,
            tag: 0,
            journal: journal.clone(),
        }
    }
}

impl Benchmark for FakeBenchmark {
    type Resources = Vec<String>;

    fn name(&self) -> &str {
        &self.name
    }

    fn sample_name(&self) -> Option<&str> {
        self.sample_name.as_deref()
    }

    fn set_sample_name(&mut self, sample_name: String) {
        self.sample_name = Some(sample_name);
    }

    fn set_resources(&mut self, resources: Vec<String>) {
        self.resources = Some(resources);
    }

    fn prepare(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()> {
        self.journal.record(format!("prepare:{}", self.name));
        timer.measure(format!("{}_prepare", self.name), || ());
        if self.fail_prepare {
            anyhow::bail!("{} could not install", self.name);
        }
        Ok(())
    }

    fn cleanup(&mut self, timer: &mut IntervalTimer) -> anyhow::Result<()> {
        self.journal.record(format!("cleanup:{}", self.name));
        timer.measure(format!("{}_cleanup", self.name), || ());
        if self.fail_cleanup {
            anyhow::bail!("{} left files behind", self.name);
        }
        Ok(())
    }
}

pub fn plan_of(journal: &Journal, sorties: &[&[&str]]) -> SortiePlan<FakeBenchmark> {
    SortiePlan::new(
        sorties
            .iter()
            .map(|s| s.iter().map(|n| FakeBenchmark::new(n, journal)).collect())
            .collect(),
    )
}

/// Returns scripted statuses in order (0 once the script runs out) and
/// records every call.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    pub statuses: Vec<i32>,
    pub calls: Vec<Vec<String>>,
    pub contexts: Vec<SortieContext>,
    journal: Journal,
}

impl ScriptedRunner {
    pub fn new(statuses: Vec<i32>, journal: &Journal) -> Self {
        Self {
            statuses,
            calls: Vec::new(),
            contexts: Vec::new(),
            journal: journal.clone(),
        }
    }
}

impl SortieRunner<FakeBenchmark> for ScriptedRunner {
    fn run_sortie(&mut self, sortie: &[FakeBenchmark], ctx: &SortieContext) -> SortieOutcome {
        let names: Vec<String> = sortie.iter().map(|b| b.name.clone()).collect();
        for name in &names {
            self.journal.record(format!("run:{name}"));
        }
        self.calls.push(names);
        self.contexts.push(ctx.clone());
        SortieOutcome {
            status: self.statuses.get(ctx.position).copied().unwrap_or(0),
            samples: Vec::new(),
        }
    }
}
