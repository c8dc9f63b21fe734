// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Phase timing for cold and warm start paths.
//!
//! A `PhaseTimer` records named checkpoints against a monotonic clock and
//! reports the time spent between consecutive checkpoints. It only observes:
//! nothing in the bootstrap path branches on a timer.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Name of the checkpoint recorded at construction.
pub const INIT_PHASE: &str = "init";

/// Line printed after the last phase of a report.
pub const REPORT_SEPARATOR: &str = "------";

/// A named checkpoint.
#[derive(Debug, Clone)]
pub struct PhaseRecord {
    pub name: String,
    pub at: Instant,
}

/// Time spent between a checkpoint and the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDelta {
    pub name: String,
    pub elapsed: Duration,
}

impl PhaseDelta {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Append-only list of checkpoints.
#[derive(Debug, Clone)]
pub struct PhaseTimer {
    records: Vec<PhaseRecord>,
}

impl PhaseTimer {
    /// Create a timer with an `init` checkpoint.
    pub fn new() -> Self {
        Self {
            records: vec![PhaseRecord {
                name: INIT_PHASE.to_string(),
                at: Instant::now(),
            }],
        }
    }

    /// Record a checkpoint now.
    pub fn track(&mut self, name: impl Into<String>) {
        self.records.push(PhaseRecord {
            name: name.into(),
            at: Instant::now(),
        });
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Names of all checkpoints in order, `init` included.
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.name == name)
    }

    /// Elapsed time for every checkpoint after the first.
    pub fn deltas(&self) -> Vec<PhaseDelta> {
        self.records
            .windows(2)
            .map(|pair| PhaseDelta {
                name: pair[1].name.clone(),
                elapsed: pair[1].at.saturating_duration_since(pair[0].at),
            })
            .collect()
    }

    /// Time between the first and the last checkpoint.
    pub fn total(&self) -> Duration {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => last.at.saturating_duration_since(first.at),
            _ => Duration::ZERO,
        }
    }

    /// Log every phase as `name: elapsed_ms` followed by a separator.
    pub fn report(&self) -> Vec<PhaseDelta> {
        let deltas = self.deltas();
        if deltas.is_empty() {
            tracing::info!("nothing to report");
            return deltas;
        }

        for delta in &deltas {
            tracing::info!(
                phase = %delta.name,
                elapsed_ms = delta.elapsed_ms(),
                "{}: {:.3}ms",
                delta.name,
                delta.elapsed_ms()
            );
        }
        tracing::info!("{}", REPORT_SEPARATOR);

        deltas
    }

    /// Render the same report as text, one line per phase.
    pub fn render(&self) -> String {
        let deltas = self.deltas();
        if deltas.is_empty() {
            return "nothing to report\n".to_string();
        }

        let mut out = String::new();
        for delta in &deltas {
            let _ = writeln!(out, "{}: {:.3}ms", delta.name, delta.elapsed_ms());
        }
        out.push_str(REPORT_SEPARATOR);
        out.push('\n');
        out
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_with_init() {
        let timer = PhaseTimer::new();
        assert_eq!(timer.names(), vec![INIT_PHASE]);
        assert!(timer.deltas().is_empty());
    }

    #[test]
    fn test_nothing_to_report() {
        let timer = PhaseTimer::new();
        assert!(timer.report().is_empty());
        assert_eq!(timer.render(), "nothing to report\n");
    }

    #[test]
    fn test_deltas_are_monotonic_and_sum_to_total() {
        let mut timer = PhaseTimer::new();
        timer.track("a");
        thread::sleep(Duration::from_millis(2));
        timer.track("b");
        timer.track("c");

        let deltas = timer.report();
        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[0].name, "a");
        assert!(deltas[1].elapsed >= Duration::from_millis(2));

        let sum: Duration = deltas.iter().map(|d| d.elapsed).sum();
        assert_eq!(sum, timer.total());
    }

    #[test]
    fn test_tracking_does_not_mutate_prior_records() {
        let mut timer = PhaseTimer::new();
        timer.track("first");
        let before = timer.records()[1].at;

        timer.track("second");
        assert_eq!(timer.records()[1].at, before);
        assert_eq!(timer.records()[1].name, "first");
    }

    #[test]
    fn test_render_format() {
        let mut timer = PhaseTimer::new();
        timer.track("load");

        let text = timer.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("load: "));
        assert!(lines[0].ends_with("ms"));
        assert_eq!(lines[1], REPORT_SEPARATOR);
    }
}
