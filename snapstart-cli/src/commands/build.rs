// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `snapstart build` command - Force a cold build of the snapshot.

use std::path::Path;

use snapstart_core::{Bootstrapper, Config, EngineRuntime, QuickJsEngine, ScriptSource};

pub fn execute(config: &Config, script: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(script = %script.display(), "Building snapshot");

    let source = ScriptSource::from_file(script)?;
    let runtime = EngineRuntime::init();
    let engine = QuickJsEngine::new(
        &runtime,
        config.engine.clone(),
        super::capabilities(config, None),
    );

    let result = Bootstrapper::new(&engine, &config.snapshot.path)
        .function_code(config.snapshot.function_code)
        .atomic_write(config.snapshot.atomic_write)
        .rebuild(&source);

    match result {
        Ok(report) => {
            println!("✓ Snapshot written");
            println!();
            println!("  Path:          {}", report.path.display());
            println!("  Size:          {} bytes", report.blob_bytes);
            println!("  Function code: {}", report.function_code);
            println!("  Completion:    {}", report.completion);
            runtime.shutdown()?;
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Snapshot build failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
