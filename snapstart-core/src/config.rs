// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Every section is optional; missing fields take their defaults. Any
//! invalid field results in a HardValidationError that prevents startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::FunctionCodeHandling;
use crate::error::{HardValidationError, SnapError, SnapResult};

/// Default snapshot file, relative to the working directory.
pub const DEFAULT_SNAPSHOT_PATH: &str = "snapshot.blob";

const DEFAULT_MEMORY_LIMIT_MB: u64 = 64;
const MAX_MEMORY_LIMIT_MB: u64 = 4096;
const DEFAULT_STACK_SIZE_KB: u64 = 1024;
const MIN_STACK_SIZE_KB: u64 = 64;
const MAX_STACK_SIZE_KB: u64 = 65536;

/// Raw snapshot section as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSnapshotConfig {
    path: String,
    function_code: String,
    atomic_write: bool,
}

impl Default for RawSnapshotConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SNAPSHOT_PATH.to_string(),
            function_code: FunctionCodeHandling::Keep.name().to_string(),
            atomic_write: true,
        }
    }
}

/// Raw engine limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawEngineConfig {
    memory_limit_mb: u64,
    max_stack_size_kb: u64,
    gc_threshold_kb: u64,
}

impl Default for RawEngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            max_stack_size_kb: DEFAULT_STACK_SIZE_KB,
            gc_threshold_kb: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCapabilityConfig {
    console: bool,
}

impl Default for RawCapabilityConfig {
    fn default() -> Self {
        Self { console: true }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    snapshot: RawSnapshotConfig,
    engine: RawEngineConfig,
    capabilities: RawCapabilityConfig,
}

/// Validated snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    pub function_code: FunctionCodeHandling,
    pub atomic_write: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            function_code: FunctionCodeHandling::Keep,
            atomic_write: true,
        }
    }
}

/// Validated engine limits, in bytes. `None` leaves the engine default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub memory_limit_bytes: Option<usize>,
    pub max_stack_size_bytes: usize,
    pub gc_threshold_bytes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: Some(mb_to_bytes(DEFAULT_MEMORY_LIMIT_MB)),
            max_stack_size_bytes: kb_to_bytes(DEFAULT_STACK_SIZE_KB),
            gc_threshold_bytes: None,
        }
    }
}

/// Which built-in capabilities the engine registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityConfig {
    pub console: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self { console: true }
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub snapshot: SnapshotConfig,
    pub engine: EngineConfig,
    pub capabilities: CapabilityConfig,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> SnapResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SnapError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SnapError::Io {
            context: "reading config file",
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> SnapResult<Config> {
        // An empty document deserializes as unit, not as an empty map
        if content.trim().is_empty() {
            return Self::validate(RawConfig::default());
        }

        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| SnapError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> SnapResult<Config> {
        Ok(Config {
            snapshot: Self::validate_snapshot(raw.snapshot)?,
            engine: Self::validate_engine(raw.engine)?,
            capabilities: CapabilityConfig {
                console: raw.capabilities.console,
            },
        })
    }

    fn validate_snapshot(raw: RawSnapshotConfig) -> Result<SnapshotConfig, HardValidationError> {
        if raw.path.trim().is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "path",
                context: "snapshot".to_string(),
            });
        }

        let function_code = FunctionCodeHandling::parse(&raw.function_code).ok_or_else(|| {
            HardValidationError::InvalidFieldValue {
                field: "function_code",
                value: raw.function_code.clone(),
                reason: "Must be 'keep' or 'clear'".to_string(),
            }
        })?;

        Ok(SnapshotConfig {
            path: PathBuf::from(raw.path),
            function_code,
            atomic_write: raw.atomic_write,
        })
    }

    fn validate_engine(raw: RawEngineConfig) -> Result<EngineConfig, HardValidationError> {
        if raw.memory_limit_mb > MAX_MEMORY_LIMIT_MB {
            return Err(HardValidationError::MemoryLimitOutOfBounds {
                limit_mb: raw.memory_limit_mb,
                max_mb: MAX_MEMORY_LIMIT_MB,
            });
        }

        if !(MIN_STACK_SIZE_KB..=MAX_STACK_SIZE_KB).contains(&raw.max_stack_size_kb) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "max_stack_size_kb",
                value: raw.max_stack_size_kb.to_string(),
                reason: format!(
                    "Must be between {} and {}",
                    MIN_STACK_SIZE_KB, MAX_STACK_SIZE_KB
                ),
            });
        }

        if raw.gc_threshold_kb > MAX_MEMORY_LIMIT_MB * 1024 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "gc_threshold_kb",
                value: raw.gc_threshold_kb.to_string(),
                reason: format!("Must not exceed {}", MAX_MEMORY_LIMIT_MB * 1024),
            });
        }

        Ok(EngineConfig {
            memory_limit_bytes: (raw.memory_limit_mb > 0).then(|| mb_to_bytes(raw.memory_limit_mb)),
            max_stack_size_bytes: kb_to_bytes(raw.max_stack_size_kb),
            gc_threshold_bytes: (raw.gc_threshold_kb > 0).then(|| kb_to_bytes(raw.gc_threshold_kb)),
        })
    }
}

fn mb_to_bytes(mb: u64) -> usize {
    (mb * 1024 * 1024) as usize
}

fn kb_to_bytes(kb: u64) -> usize {
    (kb * 1024) as usize
}
