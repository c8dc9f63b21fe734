// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `snapstart inspect` command - Validate and describe a snapshot file.

use snapstart_core::{
    BlobStore, Config, EngineRuntime, LoadOutcome, PhaseTimer, QuickJsEngine, SnapshotBlob,
    SnapshotLoader,
};

pub fn execute(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let path = &config.snapshot.path;
    tracing::info!(path = %path.display(), "Inspecting snapshot");

    if !BlobStore::exists(path) {
        eprintln!("✗ No snapshot at {}", path.display());
        std::process::exit(1);
    }

    let bytes = BlobStore::read_all(path)?;
    let runtime = EngineRuntime::init();
    let engine = QuickJsEngine::new(
        &runtime,
        config.engine.clone(),
        super::capabilities(config, None),
    );

    let summary = match engine.inspect(&SnapshotBlob::borrowed(&bytes)) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ Snapshot is invalid:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("Snapshot: {}", path.display());
    println!("  Size:           {} bytes", summary.total_bytes);
    println!("  Format version: {}", summary.format_version);
    println!(
        "  Engine:         {}{}",
        summary.engine_version,
        if summary.engine_matches {
            ""
        } else {
            " (does not match linked engine)"
        }
    );
    println!("  Function code:  {}", summary.function_code);
    println!("  Capabilities:   {}", summary.capabilities.join(", "));
    println!("  Scripts ({}):", summary.scripts.len());
    for (name, len) in &summary.scripts {
        println!("    - {} ({} bytes of bytecode)", name, len);
    }
    println!("  Captured globals ({}):", summary.globals.len());
    for (name, len) in &summary.globals {
        println!("    - {} ({} bytes)", name, len);
    }
    println!();

    let mut timer = PhaseTimer::new();
    let blob = SnapshotBlob::borrowed(&bytes);
    let restored = match SnapshotLoader::new(&engine).load_blob(&blob, &mut timer) {
        LoadOutcome::Loaded(warm) => {
            drop(warm);
            println!("✓ Snapshot restores cleanly");
            true
        }
        LoadOutcome::Missing => false,
        LoadOutcome::Rejected(e) => {
            eprintln!("✗ Snapshot does not restore:");
            eprintln!("  {}", e);
            false
        }
    };

    runtime.shutdown()?;
    if !restored {
        std::process::exit(1);
    }
    Ok(())
}
