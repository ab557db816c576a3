//! The sortie plan and its sub-benchmark enumeration.
//!
//! A benchmark name may appear in several sorties. Setup and teardown happen
//! once per distinct name (first occurrence wins); the run phase sees every
//! occurrence. Enumeration is lazy and can be restarted any number of times
//! from the same plan.

use crate::benchmark::Benchmark;
use std::collections::HashSet;
use std::iter::Flatten;
use std::slice::{Iter, IterMut};

#[derive(Debug, Clone, Default)]
pub struct SortiePlan<B> {
    sorties: Vec<Vec<B>>,
}

impl<B: Benchmark> SortiePlan<B> {
    pub fn new(sorties: Vec<Vec<B>>) -> Self {
        Self { sorties }
    }

    pub fn sorties(&self) -> &[Vec<B>] {
        &self.sorties
    }

    pub fn len(&self) -> usize {
        self.sorties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorties.is_empty()
    }

    /// Member names per sortie, exactly as planned (no dedup).
    pub fn manifest(&self) -> Vec<Vec<String>> {
        self.sorties
            .iter()
            .map(|sortie| sortie.iter().map(|b| b.name().to_string()).collect())
            .collect()
    }

    /// Every instance when `unique` is false; first occurrence per name when true.
    pub fn sub_benchmarks(&self, unique: bool) -> SubBenchmarks<'_, B> {
        SubBenchmarks {
            inner: self.sorties.iter().flatten(),
            seen: unique.then(HashSet::new),
        }
    }

    pub fn unique_sub_benchmarks(&self) -> SubBenchmarks<'_, B> {
        self.sub_benchmarks(true)
    }

    pub fn sub_benchmarks_mut(&mut self, unique: bool) -> SubBenchmarksMut<'_, B> {
        SubBenchmarksMut {
            inner: self.sorties.iter_mut().flatten(),
            seen: unique.then(HashSet::new),
        }
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

pub struct SubBenchmarks<'a, B> {
    inner: Flatten<Iter<'a, Vec<B>>>,
    seen: Option<HashSet<&'a str>>,
}

impl<'a, B: Benchmark> Iterator for SubBenchmarks<'a, B> {
    type Item = &'a B;

    fn next(&mut self) -> Option<&'a B> {
        loop {
            let bm = self.inner.next()?;
            match &mut self.seen {
                None => return Some(bm),
                Some(seen) => {
                    if seen.insert(bm.name()) {
                        return Some(bm);
                    }
                }
            }
        }
    }
}

pub struct SubBenchmarksMut<'a, B> {
    inner: Flatten<IterMut<'a, Vec<B>>>,
    seen: Option<HashSet<String>>,
}

impl<'a, B: Benchmark> Iterator for SubBenchmarksMut<'a, B> {
    type Item = &'a mut B;

    fn next(&mut self) -> Option<&'a mut B> {
        loop {
            let bm = self.inner.next()?;
            match &mut self.seen {
                None => return Some(bm),
                Some(seen) => {
                    if seen.insert(bm.name().to_string()) {
                        return Some(bm);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
