// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Cold build: fresh environment → script → snapshot file.

use std::path::{Path, PathBuf};

use super::phases;
use crate::engine::{FunctionCodeHandling, ScriptEngine, ScriptValue};
use crate::error::{EngineError, SnapResult};
use crate::store::BlobStore;
use crate::timer::PhaseTimer;
use crate::types::ScriptSource;

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub path: PathBuf,
    pub blob_bytes: usize,
    /// Completion value of the script's top-level code.
    pub completion: ScriptValue,
    pub function_code: FunctionCodeHandling,
}

/// Builds a snapshot file from a script.
pub struct SnapshotBuilder<'a, E: ScriptEngine> {
    engine: &'a E,
    function_code: FunctionCodeHandling,
    atomic_write: bool,
}

impl<'a, E: ScriptEngine> SnapshotBuilder<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self {
            engine,
            function_code: FunctionCodeHandling::Keep,
            atomic_write: true,
        }
    }

    pub fn function_code(mut self, mode: FunctionCodeHandling) -> Self {
        self.function_code = mode;
        self
    }

    /// Write through a temp file and rename (default), or write in place.
    pub fn atomic_write(mut self, atomic: bool) -> Self {
        self.atomic_write = atomic;
        self
    }

    /// Evaluate `source` in a fresh environment and persist the result to
    /// `output`. Nothing is written if the script throws.
    pub fn create(
        &self,
        source: &ScriptSource,
        output: impl AsRef<Path>,
        timer: &mut PhaseTimer,
    ) -> SnapResult<BuildReport> {
        let output = output.as_ref();
        let engine = self.engine;

        tracing::info!(
            engine = engine.name(),
            script = %source.name(),
            path = %output.display(),
            "Building snapshot"
        );

        let mut env = engine.create_environment()?;
        timer.track(phases::ENVIRONMENT_CREATED);

        let scope = engine.open_scope(&mut env)?;
        timer.track(phases::SCOPE_OPENED);

        for capability in engine.capabilities().iter() {
            engine.bind(&mut env, &scope, capability)?;
        }
        timer.track(phases::CAPABILITIES_BOUND);

        let completion = engine.evaluate(&mut env, &scope, source)?;
        timer.track(phases::SCRIPT_COMPILED);

        let index = engine.set_default_scope(&mut env, scope)?;
        timer.track(phases::SCOPE_REGISTERED);

        let blob = engine.serialize(env, self.function_code)?;
        if !blob.is_valid() {
            return Err(EngineError::Serialize {
                reason: "engine produced an empty blob".to_string(),
            }
            .into());
        }
        timer.track(phases::SNAPSHOT_SERIALIZED);

        if self.atomic_write {
            BlobStore::write_atomic(blob.as_bytes(), output)?;
        } else {
            BlobStore::write_all(blob.as_bytes(), output)?;
        }
        let blob_bytes = blob.release();
        timer.track(phases::SNAPSHOT_WRITTEN);

        tracing::info!(
            path = %output.display(),
            bytes = blob_bytes,
            context_index = index,
            function_code = %self.function_code,
            "Snapshot written"
        );

        Ok(BuildReport {
            path: output.to_path_buf(),
            blob_bytes,
            completion,
            function_code: self.function_code,
        })
    }
}
