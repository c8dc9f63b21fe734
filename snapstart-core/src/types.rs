// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, ScriptError, SnapResult};
use crate::store::BlobStore;

/// Maximum length of a capability name, including the namespace.
const MAX_CAPABILITY_NAME_LEN: usize = 64;

/// Script source text together with the name used in stack traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    name: String,
    code: String,
}

impl ScriptSource {
    /// Create a new script source.
    ///
    /// The engine hands source text to C code, so interior NUL bytes are
    /// rejected here rather than truncating the script silently.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Result<Self, ScriptError> {
        let name = name.into();
        let code = code.into();

        if name.is_empty() {
            return Err(ScriptError::InvalidSource {
                name,
                reason: "script name cannot be empty".to_string(),
            });
        }

        if name.contains('\0') || code.contains('\0') {
            return Err(ScriptError::InvalidSource {
                name,
                reason: "script contains a NUL byte".to_string(),
            });
        }

        Ok(Self { name, code })
    }

    /// Decode UTF-8 source bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ScriptError> {
        let name = name.into();
        match String::from_utf8(bytes) {
            Ok(code) => Self::new(name, code),
            Err(e) => Err(ScriptError::InvalidSource {
                name,
                reason: format!("not valid UTF-8: {}", e.utf8_error()),
            }),
        }
    }

    /// Read a script file through the blob store.
    pub fn from_file(path: impl AsRef<Path>) -> SnapResult<Self> {
        let path = path.as_ref();
        let bytes = BlobStore::read_all(path)?;
        Ok(Self::from_bytes(path.display().to_string(), bytes)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Validated capability name.
///
/// A plain identifier (`log`) or one namespace level (`console.log`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Create a new CapabilityName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() || name.len() > MAX_CAPABILITY_NAME_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "capability_name",
                value: name.clone(),
                reason: format!(
                    "Capability name must be 1 to {} chars (got {})",
                    MAX_CAPABILITY_NAME_LEN,
                    name.len()
                ),
            });
        }

        let segments: Vec<&str> = name.split('.').collect();
        if segments.len() > 2 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "capability_name",
                value: name,
                reason: "At most one namespace level is supported".to_string(),
            });
        }

        if !segments.iter().all(|s| is_identifier(s)) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "capability_name",
                value: name,
                reason: "Each segment must be a JavaScript identifier".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Built-in names that are known to be valid.
    pub(crate) fn builtin(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok());
        Self(name.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(namespace, member)` when the name is dotted.
    pub fn split_namespace(&self) -> Option<(&str, &str)> {
        self.0.split_once('.')
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CapabilityName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilityName> for String {
    fn from(name: CapabilityName) -> Self {
        name.0
    }
}
