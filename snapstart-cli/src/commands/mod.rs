// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::path::{Path, PathBuf};

use snapstart_core::{
    CapabilitySet, Config, ConfigLoader, ConsoleBuffer, FunctionCodeHandling,
    HardValidationError,
};

pub mod build;
pub mod inspect;
pub mod run;
pub mod validate;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "snapstart.yaml";

/// Load the configuration and apply command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    snapshot: Option<PathBuf>,
    function_code: Option<String>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => ConfigLoader::load_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            ConfigLoader::load_file(DEFAULT_CONFIG_FILE)?
        }
        None => Config::default(),
    };

    if let Some(snapshot) = snapshot {
        config.snapshot.path = snapshot;
    }
    if let Some(mode) = function_code {
        config.snapshot.function_code = FunctionCodeHandling::parse(&mode).ok_or_else(|| {
            HardValidationError::InvalidFieldValue {
                field: "function_code",
                value: mode.clone(),
                reason: "Must be 'keep' or 'clear'".to_string(),
            }
        })?;
    }

    tracing::debug!(
        snapshot = %config.snapshot.path.display(),
        function_code = %config.snapshot.function_code,
        "Configuration loaded"
    );
    Ok(config)
}

/// Capabilities enabled by the config, with console output optionally
/// copied into `buffer`.
pub fn capabilities(config: &Config, buffer: Option<ConsoleBuffer>) -> CapabilitySet {
    if config.capabilities.console {
        CapabilitySet::new().console(buffer)
    } else {
        CapabilitySet::new()
    }
}
