// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Cold/warm start decision.
//!
//! Try the snapshot first. On a miss or a rejected snapshot, build a new
//! one from the script and load that. The environment handed to the
//! caller always comes from deserialization, so every cold start also
//! proves the snapshot round trip.

use std::path::{Path, PathBuf};

use crate::engine::{FunctionCodeHandling, ScriptEngine, ScriptValue};
use crate::error::{BootstrapError, ScriptError, SnapResult};
use crate::snapshot::{
    phases, BuildReport, LoadOutcome, SnapshotBuilder, SnapshotLoader, WarmEnvironment,
};
use crate::state::{BootMetrics, BootState, BootStateMachine};
use crate::timer::{PhaseDelta, PhaseTimer};
use crate::types::ScriptSource;

/// How the session's environment was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum StartKind {
    /// A snapshot was built first; carries the build report.
    Cold { report: BuildReport },
    /// An existing snapshot was loaded.
    Warm,
}

/// A ready environment plus the record of how it got there.
pub struct Session<'a, E: ScriptEngine> {
    warm: WarmEnvironment<E>,
    engine: &'a E,
    start: StartKind,
    state: BootStateMachine,
    timer: PhaseTimer,
}

impl<'a, E: ScriptEngine> Session<'a, E> {
    /// Call a global function defined by the snapshotted script.
    pub fn call(&self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        self.warm.call(self.engine, name, args)
    }

    pub fn start(&self) -> &StartKind {
        &self.start
    }

    pub fn is_cold(&self) -> bool {
        matches!(self.start, StartKind::Cold { .. })
    }

    /// Completion value of the script, known only after a cold build.
    pub fn completion(&self) -> Option<&ScriptValue> {
        match &self.start {
            StartKind::Cold { report } => Some(&report.completion),
            StartKind::Warm => None,
        }
    }

    pub fn state(&self) -> BootState {
        self.state.state()
    }

    pub fn metrics(&self) -> BootMetrics {
        BootMetrics::from(&self.state)
    }

    pub fn environment(&self) -> &WarmEnvironment<E> {
        &self.warm
    }

    pub fn timer(&self) -> &PhaseTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut PhaseTimer {
        &mut self.timer
    }

    /// Log the phase report.
    pub fn report(&self) -> Vec<PhaseDelta> {
        self.timer.report()
    }

    pub fn render(&self) -> String {
        self.timer.render()
    }
}

/// Owns the cold/warm decision for one snapshot path.
pub struct Bootstrapper<'a, E: ScriptEngine> {
    engine: &'a E,
    snapshot_path: PathBuf,
    function_code: FunctionCodeHandling,
    atomic_write: bool,
}

impl<'a, E: ScriptEngine> Bootstrapper<'a, E> {
    pub fn new(engine: &'a E, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            snapshot_path: snapshot_path.into(),
            function_code: FunctionCodeHandling::Keep,
            atomic_write: true,
        }
    }

    pub fn function_code(mut self, mode: FunctionCodeHandling) -> Self {
        self.function_code = mode;
        self
    }

    pub fn atomic_write(mut self, atomic: bool) -> Self {
        self.atomic_write = atomic;
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Boot, reading the script from `script_path` only if a cold build is
    /// needed.
    pub fn boot(&self, script_path: impl AsRef<Path>) -> SnapResult<Session<'a, E>> {
        let script_path = script_path.as_ref();
        self.boot_with(|| ScriptSource::from_file(script_path))
    }

    /// Boot with an in-memory script.
    pub fn boot_source(&self, source: &ScriptSource) -> SnapResult<Session<'a, E>> {
        self.boot_with(|| Ok(source.clone()))
    }

    /// Skip the load attempt and always build a fresh snapshot.
    pub fn rebuild(&self, source: &ScriptSource) -> SnapResult<BuildReport> {
        self.builder().create(source, &self.snapshot_path, &mut PhaseTimer::new())
    }

    fn builder(&self) -> SnapshotBuilder<'a, E> {
        SnapshotBuilder::new(self.engine)
            .function_code(self.function_code)
            .atomic_write(self.atomic_write)
    }

    fn boot_with<F>(&self, read_source: F) -> SnapResult<Session<'a, E>>
    where
        F: FnOnce() -> SnapResult<ScriptSource>,
    {
        let mut timer = PhaseTimer::new();
        let mut state = BootStateMachine::new();
        let loader = SnapshotLoader::new(self.engine);

        let (mut warm, start) = match loader.load(&self.snapshot_path, &mut timer) {
            LoadOutcome::Loaded(warm) => {
                state.transition_to(BootState::WarmStart)?;
                (warm, StartKind::Warm)
            }
            outcome => {
                match &outcome {
                    LoadOutcome::Rejected(e) => tracing::warn!(
                        path = %self.snapshot_path.display(),
                        error = %e,
                        "Snapshot unusable, falling back to cold start"
                    ),
                    _ => tracing::info!(
                        path = %self.snapshot_path.display(),
                        "Cold start"
                    ),
                }
                state.transition_to(BootState::ColdStart)?;

                let source = read_source()?;
                timer.track(phases::SCRIPT_READ);

                let report = self
                    .builder()
                    .create(&source, &self.snapshot_path, &mut timer)?;

                match loader.load(&self.snapshot_path, &mut timer) {
                    LoadOutcome::Loaded(warm) => {
                        state.transition_to(BootState::WarmStart)?;
                        (warm, StartKind::Cold { report })
                    }
                    LoadOutcome::Missing => {
                        state.transition_to(BootState::Failed)?;
                        return Err(self.rejected("snapshot file missing after build"));
                    }
                    LoadOutcome::Rejected(e) => {
                        state.transition_to(BootState::Failed)?;
                        return Err(self.rejected(&e.to_string()));
                    }
                }
            }
        };

        if let Err(e) = warm.rebind(self.engine) {
            state.transition_to(BootState::Failed)?;
            return Err(e.into());
        }
        timer.track(phases::CAPABILITIES_REBOUND);
        state.transition_to(BootState::Ready)?;

        tracing::info!(
            path = %self.snapshot_path.display(),
            cold = state.was_cold(),
            elapsed_ms = timer.total().as_secs_f64() * 1000.0,
            "Environment ready"
        );

        Ok(Session {
            warm,
            engine: self.engine,
            start,
            state,
            timer,
        })
    }

    fn rejected(&self, reason: &str) -> crate::error::SnapError {
        tracing::error!(
            path = %self.snapshot_path.display(),
            reason,
            "Rebuilt snapshot could not be loaded"
        );
        BootstrapError::RebuiltSnapshotRejected {
            path: self.snapshot_path.clone(),
            reason: reason.to_string(),
        }
        .into()
    }
}
