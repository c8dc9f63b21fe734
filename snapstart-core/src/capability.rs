// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Native capabilities exposed to scripts.
//!
//! A capability is a named host function. The engine keeps a
//! [`CapabilitySet`] so that a snapshot can record capability names and a
//! restored environment can rebind the same functions.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::HardValidationError;
use crate::types::CapabilityName;

/// Host function signature. Arguments arrive coerced to strings.
pub type CapabilityHandler = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Tracing target used for script console output.
pub const SCRIPT_LOG_TARGET: &str = "script";

/// A named host function.
#[derive(Clone)]
pub struct Capability {
    name: CapabilityName,
    handler: CapabilityHandler,
}

impl Capability {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Result<Self, HardValidationError>
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        Ok(Self {
            name: CapabilityName::new(name)?,
            handler: Arc::new(handler),
        })
    }

    pub fn name(&self) -> &CapabilityName {
        &self.name
    }

    pub fn handler(&self) -> CapabilityHandler {
        Arc::clone(&self.handler)
    }

    pub fn invoke(&self, args: &[String]) {
        (self.handler)(args)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of capabilities. Names are unique; inserting an existing
/// name replaces the handler in place.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    entries: Vec<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`CapabilitySet::insert`].
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn insert(&mut self, capability: Capability) {
        match self
            .entries
            .iter_mut()
            .find(|c| c.name == capability.name)
        {
            Some(existing) => *existing = capability,
            None => self.entries.push(capability),
        }
    }

    /// Register `log` and `console.log`, both printing through `tracing` and
    /// optionally into `buffer`.
    pub fn console(self, buffer: Option<ConsoleBuffer>) -> Self {
        let sink = move |args: &[String]| {
            let line = args.join(" ");
            tracing::info!(target: SCRIPT_LOG_TARGET, "{}", line);
            if let Some(buffer) = &buffer {
                buffer.push(line);
            }
        };
        let handler: CapabilityHandler = Arc::new(sink);

        self.with(Capability {
            name: CapabilityName::builtin("log"),
            handler: Arc::clone(&handler),
        })
        .with(Capability {
            name: CapabilityName::builtin("console.log"),
            handler,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.iter().find(|c| c.name.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared in-memory copy of console output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        // A poisoned buffer still holds valid lines
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
