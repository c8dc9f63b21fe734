// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Metrics types for start-up benchmark results.
//!
//! A report holds one result per measured path (cold build, warm load,
//! full bootstrap, function call), each with an overall latency
//! distribution and, where available, a per-phase breakdown.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::harness::PhaseSamples;

/// What a benchmark measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkCategory {
    /// Fresh environment, script evaluation and snapshot write
    ColdBuild,
    /// Snapshot read, restore and default scope derivation
    WarmLoad,
    /// Full bootstrap including the cold/warm decision
    Bootstrap,
    /// Calling into a ready environment
    Call,
}

impl BenchmarkCategory {
    pub const ALL: [BenchmarkCategory; 4] = [
        Self::ColdBuild,
        Self::WarmLoad,
        Self::Bootstrap,
        Self::Call,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ColdBuild => "cold_build",
            Self::WarmLoad => "warm_load",
            Self::Bootstrap => "bootstrap",
            Self::Call => "call",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for BenchmarkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Latency distribution of one measured path, in nanoseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub median_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub std_dev_ns: f64,
    /// Sorted raw samples, capped at [`MAX_RAW_SAMPLES`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<u64>>,
}

/// Upper bound on raw samples stored per result.
pub const MAX_RAW_SAMPLES: usize = 1000;

impl LatencyMetrics {
    pub fn from_samples(mut samples: Vec<u64>, keep_raw: bool) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();

        let len = samples.len() as f64;
        let mean_ns = samples.iter().map(|&s| s as f64).sum::<f64>() / len;
        let variance = samples
            .iter()
            .map(|&s| (s as f64 - mean_ns).powi(2))
            .sum::<f64>()
            / len;

        let raw = keep_raw.then(|| {
            let step = samples.len().div_ceil(MAX_RAW_SAMPLES).max(1);
            samples.iter().step_by(step).copied().collect()
        });

        Self {
            min_ns: samples[0],
            max_ns: samples[samples.len() - 1],
            mean_ns,
            median_ns: percentile(&samples, 50.0),
            p95_ns: percentile(&samples, 95.0),
            p99_ns: percentile(&samples, 99.0),
            std_dev_ns: variance.sqrt(),
            samples: raw,
        }
    }

    /// Format latency in human-readable form (auto-selects ns/μs/ms).
    pub fn format_latency(ns: u64) -> String {
        if ns < 1_000 {
            format!("{}ns", ns)
        } else if ns < 1_000_000 {
            format!("{:.2}μs", ns as f64 / 1_000.0)
        } else if ns < 1_000_000_000 {
            format!("{:.2}ms", ns as f64 / 1_000_000.0)
        } else {
            format!("{:.2}s", ns as f64 / 1_000_000_000.0)
        }
    }
}

/// Nearest-rank percentile of sorted, non-empty samples.
fn percentile(sorted: &[u64], pct: f64) -> u64 {
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Median cold build time against median warm load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartComparison {
    pub cold_median_ns: u64,
    pub warm_median_ns: u64,
    /// cold / warm; above 1.0 means the snapshot pays off
    pub speedup: f64,
}

impl StartComparison {
    pub fn new(cold: &LatencyMetrics, warm: &LatencyMetrics) -> Option<Self> {
        if warm.median_ns == 0 {
            return None;
        }
        Some(Self {
            cold_median_ns: cold.median_ns,
            warm_median_ns: warm.median_ns,
            speedup: cold.median_ns as f64 / warm.median_ns as f64,
        })
    }
}

/// System information captured at benchmark time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub memory_bytes: u64,
    /// Version of the linked script engine
    pub engine_version: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            engine_version: snapstart_core::engine::quickjs::engine_version(),
        }
    }
}

/// A single benchmark result with all associated metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub category: BenchmarkCategory,
    pub latency: LatencyMetrics,
    /// Per-phase breakdown, keyed by phase name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<String, LatencyMetrics>,
    pub iterations: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl BenchmarkResult {
    pub fn latency(
        name: impl Into<String>,
        category: BenchmarkCategory,
        samples: Vec<u64>,
        keep_raw_samples: bool,
    ) -> Self {
        let iterations = samples.len() as u64;
        Self {
            name: name.into(),
            category,
            latency: LatencyMetrics::from_samples(samples, keep_raw_samples),
            phases: BTreeMap::new(),
            iterations,
            metadata: HashMap::new(),
        }
    }

    /// Attach a per-phase breakdown. Raw phase samples are never kept.
    pub fn with_phases(mut self, phases: PhaseSamples) -> Self {
        self.phases = phases
            .into_inner()
            .into_iter()
            .map(|(name, samples)| (name, LatencyMetrics::from_samples(samples, false)))
            .collect();
        self
    }

    /// Add metadata to the result. Values that fail to serialize are skipped.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), value);
        }
        self
    }
}

/// Complete benchmark suite report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub benchmark_suite: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub results: Vec<BenchmarkResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<StartComparison>,
}

impl BenchmarkReport {
    pub fn new() -> Self {
        Self {
            benchmark_suite: "snapstart-benchmarks".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            results: Vec::new(),
            comparison: None,
        }
    }

    pub fn add_result(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn find(&self, category: BenchmarkCategory) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.category == category)
    }

    /// Fill in the cold/warm comparison from the recorded results.
    pub fn compare(&mut self) -> Option<&StartComparison> {
        let cold = self.find(BenchmarkCategory::ColdBuild)?;
        let warm = self.find(BenchmarkCategory::WarmLoad)?;
        self.comparison = StartComparison::new(&cold.latency, &warm.latency);
        self.comparison.as_ref()
    }
}

impl Default for BenchmarkReport {
    fn default() -> Self {
        Self::new()
    }
}
