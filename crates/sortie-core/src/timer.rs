//! Named wall-clock intervals, shared across every prepare (or cleanup) call
//! in one phase.

use crate::sample::Sample;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub name: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct IntervalTimer {
    intervals: Vec<Interval>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording how long it took under `name`.
    pub fn measure<T>(&mut self, name: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let start = Utc::now();
        let clock = Instant::now();
        let out = f();
        self.intervals.push(Interval {
            name: name.into(),
            start,
            stop: Utc::now(),
            elapsed: clock.elapsed(),
        });
        out
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// One `<name>_time` sample per recorded interval.
    pub fn generate_samples(&self) -> Vec<Sample> {
        self.intervals
            .iter()
            .map(|i| {
                Sample::new(
                    format!("{}_time", i.name),
                    i.elapsed.as_secs_f64(),
                    "seconds",
                )
                .with_meta("start_time", i.start.to_rfc3339())
                .with_meta("end_time", i.stop.to_rfc3339())
                .with_timestamp(i.stop)
            })
            .collect()
    }
}
