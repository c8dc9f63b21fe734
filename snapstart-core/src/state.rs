// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Bootstrap state machine with typed state transitions.
//!
//! Uninitialized → WarmStart → Ready on a snapshot hit,
//! Uninitialized → ColdStart → WarmStart → Ready on a miss.
//! Ready and Failed are terminal.

use std::time::Instant;

use serde::Serialize;

use crate::error::StateTransitionError;

/// Bootstrap lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootState {
    /// Nothing attempted yet.
    Uninitialized,

    /// No usable snapshot; building one from the script source.
    ColdStart,

    /// Environment reconstructed from a snapshot.
    WarmStart,

    /// Default scope derived and capabilities bound; scripts may run.
    Ready,

    /// The rebuilt snapshot could not be loaded.
    Failed,
}

impl BootState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::ColdStart => "ColdStart",
            Self::WarmStart => "WarmStart",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: BootState) -> bool {
        matches!(
            (self, target),
            // From Uninitialized
            (Self::Uninitialized, Self::WarmStart) |
            (Self::Uninitialized, Self::ColdStart) |
            // From ColdStart
            (Self::ColdStart, Self::WarmStart) |
            (Self::ColdStart, Self::Failed) |
            // From WarmStart
            (Self::WarmStart, Self::Ready) |
            (Self::WarmStart, Self::Failed)
        )
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl std::fmt::Display for BootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one bootstrap attempt.
#[derive(Debug)]
pub struct BootStateMachine {
    current_state: BootState,
    last_transition: Instant,
    transition_count: u64,
    visited_cold: bool,
}

impl BootStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: BootState::Uninitialized,
            last_transition: Instant::now(),
            transition_count: 0,
            visited_cold: false,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> BootState {
        self.current_state
    }

    /// Get time since last transition.
    pub fn time_in_current_state(&self) -> std::time::Duration {
        self.last_transition.elapsed()
    }

    /// Get total number of transitions.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Whether this attempt went through a cold build.
    pub fn was_cold(&self) -> bool {
        self.visited_cold
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: BootState) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                state: self.current_state.name(),
            });
        }
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::debug!(
            from = self.current_state.name(),
            to = target.name(),
            "Bootstrap state transition"
        );

        if target == BootState::ColdStart {
            self.visited_cold = true;
        }
        self.current_state = target;
        self.last_transition = Instant::now();
        self.transition_count += 1;

        Ok(())
    }
}

impl Default for BootStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for the state machine.
#[derive(Debug, Clone, Serialize)]
pub struct BootMetrics {
    pub current_state: String,
    pub cold: bool,
    pub time_in_state_ms: u64,
    pub transition_count: u64,
}

impl From<&BootStateMachine> for BootMetrics {
    fn from(sm: &BootStateMachine) -> Self {
        Self {
            current_state: sm.current_state.name().to_string(),
            cold: sm.visited_cold,
            time_in_state_ms: sm.time_in_current_state().as_millis() as u64,
            transition_count: sm.transition_count,
        }
    }
}
