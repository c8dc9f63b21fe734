// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Script engine seam.
//!
//! The snapshot builder and loader only talk to a [`ScriptEngine`]. An
//! implementation owns what an environment and a scope are, how native
//! capabilities are bound, and what the serialized blob looks like.

use std::fmt;

use crate::blob::SnapshotBlob;
use crate::capability::{Capability, CapabilitySet};
use crate::error::{EngineError, ScriptError, SnapshotFormatError};
use crate::types::ScriptSource;

#[cfg(test)]
pub(crate) mod mock;
pub mod quickjs;
mod runtime;

pub use quickjs::{QuickJsEngine, QuickJsEnvironment, QuickJsScope, SnapshotSummary};
pub use runtime::{EngineRuntime, EnvironmentTicket, EnvironmentTracker};

/// Index of the scope registered as the snapshot's default context.
pub const DEFAULT_CONTEXT_INDEX: usize = 0;

/// Whether compiled function code is kept in the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionCodeHandling {
    /// Keep source text and debug info alongside the bytecode.
    #[default]
    Keep,
    /// Strip source text and debug info.
    Clear,
}

impl FunctionCodeHandling {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Clear => "clear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keep" => Some(Self::Keep),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionCodeHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A script value copied out of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Objects, functions and anything else, in their string form.
    Other(String),
}

impl ScriptValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Interpret a command-line argument: numbers, booleans and `null`
    /// keep their type, anything else is a string.
    pub fn parse_arg(arg: &str) -> Self {
        match arg {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ => match arg.parse::<f64>() {
                Ok(n) => Self::Number(n),
                Err(_) => Self::String(arg.to_string()),
            },
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) if n.is_nan() => write!(f, "NaN"),
            Self::Number(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // -0 prints as 0
            Self::Number(n) if *n == 0.0 => write!(f, "0"),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) | Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Operations the snapshot lifecycle needs from an embedded engine.
///
/// An environment is an isolated engine instance; a scope is a global
/// object inside one. Scopes must be dropped before their environment.
pub trait ScriptEngine {
    type Environment;
    type Scope;

    /// Short engine identifier for logs.
    fn name(&self) -> &'static str;

    /// Capabilities bound into every scope this engine creates.
    fn capabilities(&self) -> &CapabilitySet;

    /// Create a fresh environment (cold initialization).
    fn create_environment(&self) -> Result<Self::Environment, EngineError>;

    /// Create a scope inside `env`.
    fn open_scope(&self, env: &mut Self::Environment) -> Result<Self::Scope, EngineError>;

    /// Expose `capability` in `scope`. Rebinding the same name replaces it.
    fn bind(
        &self,
        env: &mut Self::Environment,
        scope: &Self::Scope,
        capability: &Capability,
    ) -> Result<(), EngineError>;

    /// Compile and run `source` in `scope`, returning its completion value.
    fn evaluate(
        &self,
        env: &mut Self::Environment,
        scope: &Self::Scope,
        source: &ScriptSource,
    ) -> Result<ScriptValue, ScriptError>;

    /// Call the global function `name` in `scope`.
    fn call(
        &self,
        scope: &Self::Scope,
        name: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;

    /// Register `scope` as the serialization root. Returns its index.
    fn set_default_scope(
        &self,
        env: &mut Self::Environment,
        scope: Self::Scope,
    ) -> Result<usize, EngineError>;

    /// Serialize the environment, consuming it.
    fn serialize(
        &self,
        env: Self::Environment,
        function_code: FunctionCodeHandling,
    ) -> Result<SnapshotBlob<'static>, EngineError>;

    /// Build an environment from a blob. The blob must outlive the call;
    /// it may be released once [`ScriptEngine::context_from_snapshot`] returns.
    fn restore(&self, blob: &SnapshotBlob<'_>) -> Result<Self::Environment, SnapshotFormatError>;

    /// Derive the scope stored at `index` in a restored environment.
    fn context_from_snapshot(
        &self,
        env: &mut Self::Environment,
        index: usize,
    ) -> Result<Self::Scope, SnapshotFormatError>;
}
