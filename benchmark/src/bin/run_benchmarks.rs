// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI tool to run all benchmarks and generate reports.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use snapstart_benchmark::workload::{self, ENTRY_FUNCTION};
use snapstart_benchmark::{
    BenchmarkCategory, BenchmarkHarness, BenchmarkReport, BenchmarkResult, JsonReporter,
    LatencyMetrics, Workload,
};
use snapstart_core::{
    Bootstrapper, EngineRuntime, PhaseTimer, QuickJsEngine, ScriptSource, ScriptValue,
    SnapshotBuilder, SnapshotLoader,
};
use tempfile::TempDir;

#[derive(Parser)]
#[command(name = "run_benchmarks")]
#[command(about = "Measure snapstart cold builds against warm loads")]
struct Args {
    /// Output directory for benchmark data
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Number of iterations for each benchmark
    #[arg(short, long, default_value_t = 50)]
    iterations: u64,

    /// Categories to run: cold_build, warm_load, bootstrap, call (all if not specified)
    #[arg(short, long)]
    category: Option<Vec<String>>,

    /// Benchmark this script instead of the generated workload
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Run in quick mode (fewer iterations, small workload)
    #[arg(long)]
    quick: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let iterations = if args.quick { 10 } else { args.iterations };
    let categories = match &args.category {
        None => BenchmarkCategory::ALL.to_vec(),
        Some(names) => names
            .iter()
            .map(|name| {
                BenchmarkCategory::parse(name)
                    .with_context(|| format!("unknown benchmark category '{}'", name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
    };

    let source = match &args.script {
        Some(path) => ScriptSource::from_file(path)?,
        None if args.quick => Workload::small().source()?,
        None => Workload::large().source()?,
    };

    println!("Snapstart Benchmark Suite");
    println!("=========================");
    println!("Output directory: {:?}", args.output);
    println!("Script: {} ({} bytes)", source.name(), source.code().len());
    println!("Iterations: {}", iterations);
    println!();

    let reporter = JsonReporter::new(&args.output)?;
    let mut report = BenchmarkReport::new();

    let runtime = EngineRuntime::init();
    let engine = workload::engine(&runtime);
    let harness = BenchmarkHarness::new()
        .warmup((iterations / 10).max(1))
        .iterations(iterations);

    let scratch = TempDir::new()?;
    let snapshot_path = scratch.path().join("snapshot.blob");
    let build =
        SnapshotBuilder::new(&engine).create(&source, &snapshot_path, &mut PhaseTimer::new())?;
    println!(
        "Reference snapshot: {} bytes, completion {}",
        build.blob_bytes, build.completion
    );
    println!();

    for category in categories {
        println!("Running {} benchmarks...", category);
        match category {
            BenchmarkCategory::ColdBuild => {
                run_cold_build(&mut report, &harness, &engine, &source)
            }
            BenchmarkCategory::WarmLoad => {
                run_warm_load(&mut report, &harness, &engine, &snapshot_path, build.blob_bytes)
            }
            BenchmarkCategory::Bootstrap => {
                run_bootstrap(&mut report, &harness, &engine, &source, &snapshot_path)
            }
            BenchmarkCategory::Call => run_call(&mut report, &harness, &engine, &source)?,
        }
    }
    drop(engine);
    runtime.shutdown()?;

    report.compare();

    let path = reporter.save(&report)?;
    println!();
    println!("Benchmark report saved to: {:?}", path);
    println!();

    print_summary(&report);

    Ok(())
}

/// Each iteration writes into its own directory so no build sees a
/// previous iteration's file.
fn run_cold_build(
    report: &mut BenchmarkReport,
    harness: &BenchmarkHarness,
    engine: &QuickJsEngine,
    source: &ScriptSource,
) {
    let builder = SnapshotBuilder::new(engine);
    let mut failures = 0u64;

    let mut dirs = Vec::new();
    let (samples, phases) = harness.run_phased(|timer| {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => {
                failures += 1;
                return;
            }
        };
        timer.track("scratch_created");
        if builder.create(source, dir.path().join("snapshot.blob"), timer).is_err() {
            failures += 1;
        }
        dirs.push(dir);
    });
    drop(dirs);

    report.add_result(
        BenchmarkResult::latency(
            "cold_build",
            BenchmarkCategory::ColdBuild,
            samples,
            harness.should_keep_samples(),
        )
        .with_phases(phases)
        .with_metadata("script_bytes", source.code().len())
        .with_metadata("failures", failures),
    );
    println!("  ✓ cold_build");
}

fn run_warm_load(
    report: &mut BenchmarkReport,
    harness: &BenchmarkHarness,
    engine: &QuickJsEngine,
    snapshot_path: &std::path::Path,
    blob_bytes: usize,
) {
    let loader = SnapshotLoader::new(engine);
    let mut failures = 0u64;

    let (samples, phases) = harness.run_phased(|timer| {
        if !loader.load(snapshot_path, timer).is_loaded() {
            failures += 1;
        }
    });

    report.add_result(
        BenchmarkResult::latency(
            "warm_load",
            BenchmarkCategory::WarmLoad,
            samples,
            harness.should_keep_samples(),
        )
        .with_phases(phases)
        .with_metadata("blob_bytes", blob_bytes)
        .with_metadata("failures", failures),
    );
    println!("  ✓ warm_load");
}

fn run_bootstrap(
    report: &mut BenchmarkReport,
    harness: &BenchmarkHarness,
    engine: &QuickJsEngine,
    source: &ScriptSource,
    snapshot_path: &std::path::Path,
) {
    // Cold: the snapshot path never exists when the boot starts.
    let samples = harness.run_with_setup(
        || TempDir::new().ok(),
        |dir| {
            if let Some(dir) = dir {
                let bootstrapper = Bootstrapper::new(engine, dir.path().join("snapshot.blob"));
                let _ = bootstrapper.boot_source(source);
            }
        },
    );
    report.add_result(
        BenchmarkResult::latency(
            "bootstrap_cold",
            BenchmarkCategory::Bootstrap,
            samples,
            harness.should_keep_samples(),
        )
        .with_metadata("start", "cold"),
    );
    println!("  ✓ bootstrap_cold");

    let bootstrapper = Bootstrapper::new(engine, snapshot_path);
    let mut cold_starts = 0u64;
    let samples = harness.run(|| match bootstrapper.boot_source(source) {
        Ok(session) if session.is_cold() => cold_starts += 1,
        Ok(_) => {}
        Err(_) => cold_starts += 1,
    });
    report.add_result(
        BenchmarkResult::latency(
            "bootstrap_warm",
            BenchmarkCategory::Bootstrap,
            samples,
            harness.should_keep_samples(),
        )
        .with_metadata("start", "warm")
        .with_metadata("unexpected_cold_starts", cold_starts),
    );
    println!("  ✓ bootstrap_warm");
}

fn run_call(
    report: &mut BenchmarkReport,
    harness: &BenchmarkHarness,
    engine: &QuickJsEngine,
    source: &ScriptSource,
) -> anyhow::Result<()> {
    let scratch = TempDir::new()?;
    let session =
        Bootstrapper::new(engine, scratch.path().join("snapshot.blob")).boot_source(source)?;

    let function = if session.call(ENTRY_FUNCTION, &[ScriptValue::Number(1.0)]).is_ok() {
        ENTRY_FUNCTION
    } else {
        println!("  - skipped: script defines no '{}' function", ENTRY_FUNCTION);
        return Ok(());
    };

    let mut x = 0.0;
    let samples = harness.run(|| {
        x += 1.0;
        let _ = session.call(function, &[ScriptValue::Number(x)]);
    });

    report.add_result(
        BenchmarkResult::latency(
            "call_entry",
            BenchmarkCategory::Call,
            samples,
            harness.should_keep_samples(),
        )
        .with_metadata("function", function),
    );
    println!("  ✓ call_entry");
    Ok(())
}

fn print_summary(report: &BenchmarkReport) {
    println!("Summary");
    println!("-------");
    println!();

    for result in &report.results {
        println!(
            "{}: median={}, p99={}",
            result.name,
            LatencyMetrics::format_latency(result.latency.median_ns),
            LatencyMetrics::format_latency(result.latency.p99_ns)
        );
        for (phase, latency) in &result.phases {
            println!(
                "    {:<24} median={}",
                phase,
                LatencyMetrics::format_latency(latency.median_ns)
            );
        }
    }

    if let Some(comparison) = &report.comparison {
        println!();
        println!(
            "Warm load is {:.1}x faster than a cold build ({} vs {})",
            comparison.speedup,
            LatencyMetrics::format_latency(comparison.warm_median_ns),
            LatencyMetrics::format_latency(comparison.cold_median_ns)
        );
    }
}
