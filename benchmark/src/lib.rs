// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Snapstart Benchmarking Framework
//!
//! Measures what a snapshot saves: the cost of a cold build (fresh
//! environment, compile, evaluate, serialize, write) against a warm load
//! (read, restore, derive the default scope).
//!
//! # Benchmark Categories
//!
//! - **Cold Build**: `SnapshotBuilder::create` into a fresh path
//! - **Warm Load**: `SnapshotLoader::load` of an existing snapshot
//! - **Bootstrap**: the full cold and warm paths through `Bootstrapper`
//! - **Call**: a function call into a ready environment
//!
//! # Data Output
//!
//! `run_benchmarks` writes a JSON report with per-phase breakdowns.

pub mod harness;
pub mod metrics;
pub mod reporter;
pub mod workload;

pub use harness::{BenchmarkHarness, PhaseSamples};
pub use metrics::{
    BenchmarkCategory, BenchmarkReport, BenchmarkResult, LatencyMetrics, StartComparison,
    SystemInfo,
};
pub use reporter::JsonReporter;
pub use workload::Workload;
