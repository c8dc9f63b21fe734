// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `snapstart validate` command - Validate configuration file.

use std::path::Path;

use snapstart_core::ConfigLoader;

pub fn execute(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file.display(), "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Snapshot Settings:");
            println!("  Path:           {}", config.snapshot.path.display());
            println!("  Function Code:  {}", config.snapshot.function_code);
            println!("  Atomic Write:   {}", config.snapshot.atomic_write);
            println!();
            println!("Engine Settings:");
            println!(
                "  Memory Limit:   {}",
                format_bytes(config.engine.memory_limit_bytes)
            );
            println!(
                "  Max Stack:      {}",
                format_bytes(Some(config.engine.max_stack_size_bytes))
            );
            println!(
                "  GC Threshold:   {}",
                format_bytes(config.engine.gc_threshold_bytes)
            );
            println!();
            println!(
                "Capabilities:     console {}",
                if config.capabilities.console { "on" } else { "off" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn format_bytes(bytes: Option<usize>) -> String {
    match bytes {
        None => "engine default".to_string(),
        Some(b) if b >= 1024 * 1024 && b % (1024 * 1024) == 0 => {
            format!("{} MB", b / (1024 * 1024))
        }
        Some(b) if b >= 1024 && b % 1024 == 0 => format!("{} KB", b / 1024),
        Some(b) => format!("{} bytes", b),
    }
}
