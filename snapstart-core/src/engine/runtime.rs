// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-wide engine runtime handle.
//!
//! Engines are created from an [`EngineRuntime`] and every environment they
//! create holds an [`EnvironmentTicket`]. Shutdown is refused while tickets
//! are outstanding, which keeps the order environments → runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::EngineError;

/// Explicit engine platform handle with `init` / `shutdown`.
#[derive(Debug)]
pub struct EngineRuntime {
    tracker: EnvironmentTracker,
}

impl EngineRuntime {
    pub fn init() -> Self {
        tracing::debug!("Engine runtime initialized");
        Self {
            tracker: EnvironmentTracker::default(),
        }
    }

    pub fn tracker(&self) -> EnvironmentTracker {
        self.tracker.clone()
    }

    pub fn live_environments(&self) -> usize {
        self.tracker.live()
    }

    /// Tear down the runtime. Fails if any environment is still alive.
    pub fn shutdown(self) -> Result<(), EngineError> {
        let count = self.tracker.live();
        if count > 0 {
            return Err(EngineError::LiveEnvironments { count });
        }
        tracing::debug!("Engine runtime shut down");
        Ok(())
    }
}

/// Counts live environments. Cloned into every engine.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentTracker {
    live: Arc<AtomicUsize>,
}

impl EnvironmentTracker {
    /// Register a new environment; the count drops when the ticket does.
    pub fn issue(&self) -> EnvironmentTicket {
        self.live.fetch_add(1, Ordering::SeqCst);
        EnvironmentTicket {
            live: Arc::clone(&self.live),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Held by an environment for as long as it exists.
#[derive(Debug)]
pub struct EnvironmentTicket {
    live: Arc<AtomicUsize>,
}

impl Drop for EnvironmentTicket {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
