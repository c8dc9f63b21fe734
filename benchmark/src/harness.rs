// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark harness for running and timing start-up paths.
//!
//! Besides whole-operation latency, the harness can fold the per-phase
//! deltas of a [`PhaseTimer`] into per-phase sample sets, so a report can
//! show where a cold or warm start spends its time.

use std::collections::BTreeMap;
use std::time::Instant;

use snapstart_core::PhaseTimer;

/// A benchmark harness for measuring operation latency.
pub struct BenchmarkHarness {
    /// Number of warmup iterations before measurement
    warmup_iterations: u64,
    /// Number of measurement iterations
    measurement_iterations: u64,
    /// Whether to keep raw sample data
    keep_raw_samples: bool,
}

impl BenchmarkHarness {
    /// Create a new benchmark harness with default settings.
    pub fn new() -> Self {
        Self {
            warmup_iterations: 5,
            measurement_iterations: 50,
            keep_raw_samples: true,
        }
    }

    /// Set the number of warmup iterations.
    pub fn warmup(mut self, iterations: u64) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    /// Set the number of measurement iterations.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.measurement_iterations = iterations;
        self
    }

    /// Set whether to keep raw sample data.
    pub fn keep_samples(mut self, keep: bool) -> Self {
        self.keep_raw_samples = keep;
        self
    }

    pub fn should_keep_samples(&self) -> bool {
        self.keep_raw_samples
    }

    /// Run `operation` and collect latency samples in nanoseconds.
    pub fn run<F>(&self, mut operation: F) -> Vec<u64>
    where
        F: FnMut(),
    {
        self.run_with_setup(|| (), |_| operation())
    }

    /// Run `operation` on a fresh value from `setup` each iteration.
    ///
    /// Only the operation is timed; the value is dropped outside the timed
    /// region.
    pub fn run_with_setup<S, T, O>(&self, mut setup: S, mut operation: O) -> Vec<u64>
    where
        S: FnMut() -> T,
        O: FnMut(&T),
    {
        for _ in 0..self.warmup_iterations {
            operation(&setup());
        }

        let mut samples = Vec::with_capacity(self.measurement_iterations as usize);
        for _ in 0..self.measurement_iterations {
            let input = setup();
            let start = Instant::now();
            operation(&input);
            samples.push(start.elapsed().as_nanos() as u64);
            drop(input);
        }
        samples
    }

    /// Like [`BenchmarkHarness::run`], but `operation` fills a
    /// [`PhaseTimer`] whose deltas are collected per phase.
    pub fn run_phased<F>(&self, mut operation: F) -> (Vec<u64>, PhaseSamples)
    where
        F: FnMut(&mut PhaseTimer),
    {
        for _ in 0..self.warmup_iterations {
            operation(&mut PhaseTimer::new());
        }

        let mut samples = Vec::with_capacity(self.measurement_iterations as usize);
        let mut phases = PhaseSamples::default();
        for _ in 0..self.measurement_iterations {
            let mut timer = PhaseTimer::new();
            let start = Instant::now();
            operation(&mut timer);
            samples.push(start.elapsed().as_nanos() as u64);
            phases.collect(&timer);
        }
        (samples, phases)
    }
}

impl Default for BenchmarkHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-phase latency samples gathered across iterations.
#[derive(Debug, Default, Clone)]
pub struct PhaseSamples {
    phases: BTreeMap<String, Vec<u64>>,
}

impl PhaseSamples {
    /// Add every delta of `timer` to its phase's samples.
    pub fn collect(&mut self, timer: &PhaseTimer) {
        for delta in timer.deltas() {
            self.phases
                .entry(delta.name)
                .or_default()
                .push(delta.elapsed.as_nanos() as u64);
        }
    }

    pub fn get(&self, phase: &str) -> Option<&[u64]> {
        self.phases.get(phase).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<u64>> {
        self.phases
    }
}
