//! Custom error types for snapstart.
//!
//! Every failure is an explicit enum variant. The library never returns
//! `Box<dyn Error>` or `anyhow::Result`; the CLI is the only place errors
//! are erased.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the snapshot lifecycle.
#[derive(Debug, Error)]
pub enum SnapError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Bootstrap State Machine Errors
    // =========================================================================
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    // =========================================================================
    // Script Errors - Fatal to the Current Attempt
    // =========================================================================
    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(#[from] ScriptError),

    // =========================================================================
    // Snapshot Errors - Recoverable Once by Rebuilding
    // =========================================================================
    #[error("Snapshot format error: {0}")]
    SnapshotFormat(#[from] SnapshotFormatError),

    #[error("Snapshot ownership violation: {0}")]
    Ownership(#[from] OwnershipError),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} ({path}) - {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors stop the process before any engine work starts.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Memory limit out of bounds: {limit_mb} MB (max: {max_mb} MB)")]
    MemoryLimitOutOfBounds { limit_mb: u64, max_mb: u64 },
}

/// State transition errors for the bootstrap state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition bootstrap from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Bootstrap is in terminal state: {state}")]
    TerminalState { state: &'static str },
}

/// Errors raised by script code running inside an environment.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Uncaught exception: {message}")]
    Uncaught {
        message: String,
        stack: Option<String>,
    },

    #[error("Invalid script source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },

    #[error("'{name}' is not a function")]
    NotAFunction { name: String },
}

/// A snapshot blob that cannot be turned back into an environment.
#[derive(Debug, Error)]
pub enum SnapshotFormatError {
    #[error("Snapshot is empty")]
    Empty,

    #[error("Snapshot too short: {actual} bytes (need at least {expected})")]
    TooShort { expected: usize, actual: usize },

    #[error("Snapshot magic mismatch")]
    BadMagic,

    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("Snapshot was produced by engine {found}, running {expected}")]
    EngineMismatch { found: String, expected: String },

    #[error("Snapshot checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Malformed snapshot: {reason}")]
    Malformed { reason: String },

    #[error("Context index {index} out of range ({available} available)")]
    ContextIndexOutOfRange { index: usize, available: usize },

    #[error("Snapshot references unknown capability '{name}'")]
    UnknownCapability { name: String },

    #[error("Failed to restore environment from snapshot: {reason}")]
    Restore { reason: String },
}

/// Failures inside the engine that are not caused by script code.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to create engine runtime: {reason}")]
    RuntimeCreate { reason: String },

    #[error("Failed to create script context: {reason}")]
    ContextCreate { reason: String },

    #[error("Failed to bind capability '{name}': {reason}")]
    Bind { name: String, reason: String },

    #[error("Failed to serialize environment: {reason}")]
    Serialize { reason: String },

    #[error("No default scope registered before serialization")]
    NoDefaultScope,

    #[error("Default scope already registered at index {index}")]
    DefaultScopeTaken { index: usize },

    #[error("Engine shutdown refused: {count} environment(s) still alive")]
    LiveEnvironments { count: usize },
}

/// The cold-start fallback could not produce a loadable snapshot.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Rebuilt snapshot at {path} still failed to load: {reason}")]
    RebuiltSnapshotRejected { path: PathBuf, reason: String },
}

/// Violations of the snapshot backing buffer lifecycle.
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("Snapshot backing released while an environment still depends on it")]
    ReleasedWhilePinned,

    #[error("Snapshot backing already released")]
    AlreadyReleased,

    #[error("Invalid backing operation '{operation}' in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Result type alias using SnapError.
pub type SnapResult<T> = Result<T, SnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_validation_error_display() {
        let err = HardValidationError::MissingRequiredField {
            field: "path",
            context: "snapshot section".to_string(),
        };
        assert!(err.to_string().contains("path"));
        assert!(err.to_string().contains("snapshot section"));
    }

    #[test]
    fn test_error_chain() {
        let format_err = SnapshotFormatError::BadMagic;
        let snap_err: SnapError = format_err.into();
        assert!(matches!(snap_err, SnapError::SnapshotFormat(_)));
        assert!(snap_err.to_string().contains("magic"));
    }

    #[test]
    fn test_script_error_display() {
        let err: SnapError = ScriptError::Uncaught {
            message: "boom".to_string(),
            stack: None,
        }
        .into();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_checksum_display_is_hex() {
        let err = SnapshotFormatError::ChecksumMismatch {
            expected: 0xdead_beef,
            actual: 0x1,
        };
        assert!(err.to_string().contains("0xdeadbeef"));
        assert!(err.to_string().contains("0x00000001"));
    }
}
