// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Snapstart CLI
//!
//! Command-line interface for snapshot-backed script bootstrapping.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Snapstart - warm-start a JavaScript environment from a snapshot
#[derive(Parser)]
#[command(name = "snapstart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ./snapstart.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Script to boot with default options, same as `run <SCRIPT>`
    pub script: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Boot from the snapshot, building it from the script if needed
    Run {
        /// Script to build the snapshot from on a cold start
        script: PathBuf,

        /// Snapshot file (overrides the config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Call this global function after boot
        #[arg(long)]
        call: Option<String>,

        /// Argument for --call, may be repeated
        #[arg(long = "arg", requires = "call")]
        args: Vec<String>,

        /// Print the phase timing report
        #[arg(short, long)]
        report: bool,

        /// Print console output collected from the script
        #[arg(long)]
        capture: bool,

        /// Print boot metrics and phase timings as JSON
        #[arg(long, conflicts_with = "report")]
        json: bool,

        /// keep | clear (overrides the config)
        #[arg(long)]
        function_code: Option<String>,
    },

    /// Build a fresh snapshot, replacing any existing one
    Build {
        /// Script to evaluate into the snapshot
        script: PathBuf,

        /// Snapshot file (overrides the config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// keep | clear (overrides the config)
        #[arg(long)]
        function_code: Option<String>,
    },

    /// Validate and describe a snapshot file
    Inspect {
        /// Snapshot file (overrides the config)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = match (cli.command, cli.script) {
        (Some(command), _) => command,
        (None, Some(script)) => Commands::Run {
            script,
            snapshot: None,
            call: None,
            args: Vec::new(),
            report: false,
            capture: false,
            json: false,
            function_code: None,
        },
        (None, None) => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "a script path or a subcommand is required",
            )
            .exit(),
    };

    // Dispatch to command handlers
    match command {
        Commands::Run {
            script,
            snapshot,
            call,
            args,
            report,
            capture,
            json,
            function_code,
        } => {
            let config = commands::load_config(cli.config.as_deref(), snapshot, function_code)?;
            commands::run::execute(
                &config,
                &script,
                call.as_deref(),
                &args,
                commands::run::Output {
                    report,
                    capture,
                    json,
                },
            )
        }
        Commands::Build {
            script,
            snapshot,
            function_code,
        } => {
            let config = commands::load_config(cli.config.as_deref(), snapshot, function_code)?;
            commands::build::execute(&config, &script)
        }
        Commands::Inspect { snapshot } => {
            let config = commands::load_config(cli.config.as_deref(), snapshot, None)?;
            commands::inspect::execute(&config)
        }
        Commands::Validate { file } => commands::validate::execute(&file),
    }
}
