// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Warm load: snapshot file → environment → default scope.

use std::fmt;
use std::path::Path;

use super::phases;
use crate::blob::{SnapshotBacking, SnapshotBlob};
use crate::engine::{ScriptEngine, ScriptValue, DEFAULT_CONTEXT_INDEX};
use crate::error::{EngineError, ScriptError, SnapResult, SnapshotFormatError};
use crate::store::BlobStore;
use crate::timer::PhaseTimer;

/// An environment reconstructed from a snapshot, with its default scope.
///
/// The scope is declared first so it is dropped before the environment.
pub struct WarmEnvironment<E: ScriptEngine> {
    scope: E::Scope,
    environment: E::Environment,
    blob_bytes: usize,
}

impl<E: ScriptEngine> WarmEnvironment<E> {
    pub fn scope(&self) -> &E::Scope {
        &self.scope
    }

    pub fn environment(&self) -> &E::Environment {
        &self.environment
    }

    /// Size of the blob this environment was restored from.
    pub fn blob_bytes(&self) -> usize {
        self.blob_bytes
    }

    /// Bind every capability of `engine` into the default scope again.
    pub fn rebind(&mut self, engine: &E) -> Result<(), EngineError> {
        for capability in engine.capabilities().iter() {
            engine.bind(&mut self.environment, &self.scope, capability)?;
        }
        Ok(())
    }

    pub fn call(
        &self,
        engine: &E,
        name: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        engine.call(&self.scope, name, args)
    }
}

/// Result of a load attempt. Missing and invalid snapshots are outcomes,
/// not errors.
pub enum LoadOutcome<E: ScriptEngine> {
    Loaded(WarmEnvironment<E>),
    /// No snapshot file at the path.
    Missing,
    /// The file exists but could not be read or restored.
    Rejected(crate::error::SnapError),
}

impl<E: ScriptEngine> LoadOutcome<E> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn into_loaded(self) -> Option<WarmEnvironment<E>> {
        match self {
            Self::Loaded(warm) => Some(warm),
            _ => None,
        }
    }
}

impl<E: ScriptEngine> fmt::Debug for LoadOutcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(warm) => f
                .debug_struct("Loaded")
                .field("blob_bytes", &warm.blob_bytes)
                .finish_non_exhaustive(),
            Self::Missing => write!(f, "Missing"),
            Self::Rejected(err) => f.debug_tuple("Rejected").field(err).finish(),
        }
    }
}

/// Loads snapshot files into environments.
pub struct SnapshotLoader<'a, E: ScriptEngine> {
    engine: &'a E,
}

impl<'a, E: ScriptEngine> SnapshotLoader<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Load the snapshot at `path`. A missing file has no side effects.
    pub fn load(&self, path: impl AsRef<Path>, timer: &mut PhaseTimer) -> LoadOutcome<E> {
        let path = path.as_ref();

        if !BlobStore::exists(path) {
            tracing::info!(path = %path.display(), "No snapshot found");
            return LoadOutcome::Missing;
        }

        let bytes = match BlobStore::read_all(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Snapshot unreadable");
                return LoadOutcome::Rejected(e);
            }
        };
        timer.track(phases::SNAPSHOT_READ);

        match self.load_backing(SnapshotBacking::new(bytes), timer) {
            Ok(warm) => {
                tracing::info!(
                    path = %path.display(),
                    bytes = warm.blob_bytes,
                    "Snapshot loaded"
                );
                LoadOutcome::Loaded(warm)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Snapshot rejected");
                LoadOutcome::Rejected(e)
            }
        }
    }

    /// Restore from an in-memory blob. The caller keeps the bytes alive.
    pub fn load_blob(&self, blob: &SnapshotBlob<'_>, timer: &mut PhaseTimer) -> LoadOutcome<E> {
        match self.restore(blob, timer) {
            Ok(warm) => LoadOutcome::Loaded(warm),
            Err(e) => {
                tracing::warn!(bytes = blob.len(), error = %e, "Snapshot blob rejected");
                LoadOutcome::Rejected(e)
            }
        }
    }

    /// The backing stays pinned until the default scope exists and is only
    /// released after that.
    fn load_backing(
        &self,
        mut backing: SnapshotBacking,
        timer: &mut PhaseTimer,
    ) -> SnapResult<WarmEnvironment<E>> {
        backing.pin()?;
        let restored = self.restore(&backing.blob(), timer);
        backing.unpin()?;
        let warm = restored?;

        backing.release()?;
        timer.track(phases::BACKING_RELEASED);
        Ok(warm)
    }

    fn restore(
        &self,
        blob: &SnapshotBlob<'_>,
        timer: &mut PhaseTimer,
    ) -> SnapResult<WarmEnvironment<E>> {
        if !blob.is_valid() {
            return Err(SnapshotFormatError::Empty.into());
        }

        let mut environment = self.engine.restore(blob)?;
        timer.track(phases::ENVIRONMENT_RESTORED);

        let scope = self
            .engine
            .context_from_snapshot(&mut environment, DEFAULT_CONTEXT_INDEX)?;
        timer.track(phases::CONTEXT_CREATED);

        Ok(WarmEnvironment {
            scope,
            environment,
            blob_bytes: blob.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::engine::EngineRuntime;
    use crate::error::SnapError;
    use crate::snapshot::SnapshotBuilder;
    use crate::types::ScriptSource;

    fn build(engine: &MockEngine, path: &Path, code: &str) {
        let source = ScriptSource::new("main.js", code).unwrap();
        SnapshotBuilder::new(engine)
            .create(&source, path, &mut PhaseTimer::new())
            .unwrap();
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        let mut timer = PhaseTimer::new();

        let outcome = SnapshotLoader::new(&engine).load(dir.path().join("none.blob"), &mut timer);

        assert!(matches!(outcome, LoadOutcome::Missing));
        assert_eq!(timer.names(), vec!["init"]);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.blob");
        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        build(&engine, &path, "function f(x){ return x+1; } 41;");

        let mut timer = PhaseTimer::new();
        let warm = SnapshotLoader::new(&engine)
            .load(&path, &mut timer)
            .into_loaded()
            .unwrap();

        assert_eq!(
            warm.call(&engine, "f", &[ScriptValue::Number(1.0)]).unwrap(),
            ScriptValue::Number(2.0)
        );
        assert_eq!(warm.blob_bytes(), std::fs::read(&path).unwrap().len());
        assert_eq!(runtime.live_environments(), 1);
        drop(warm);
        assert_eq!(runtime.live_environments(), 0);
    }

    #[test]
    fn test_backing_released_after_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.blob");
        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        build(&engine, &path, "1;");

        let mut timer = PhaseTimer::new();
        assert!(SnapshotLoader::new(&engine).load(&path, &mut timer).is_loaded());
        assert_eq!(
            timer.names(),
            vec![
                "init",
                phases::SNAPSHOT_READ,
                phases::ENVIRONMENT_RESTORED,
                phases::CONTEXT_CREATED,
                phases::BACKING_RELEASED,
            ]
        );
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.blob");
        std::fs::write(&path, b"definitely not a snapshot").unwrap();

        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        let outcome = SnapshotLoader::new(&engine).load(&path, &mut PhaseTimer::new());

        match outcome {
            LoadOutcome::Rejected(SnapError::SnapshotFormat(SnapshotFormatError::BadMagic)) => {}
            other => panic!("expected BadMagic rejection, got {:?}", other),
        }
        assert_eq!(runtime.live_environments(), 0);
    }

    #[test]
    fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.blob");
        std::fs::write(&path, b"").unwrap();

        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        let outcome = SnapshotLoader::new(&engine).load(&path, &mut PhaseTimer::new());

        assert!(matches!(
            outcome,
            LoadOutcome::Rejected(SnapError::SnapshotFormat(SnapshotFormatError::Empty))
        ));
        assert!(!engine.events().contains(&"restore".to_string()));
    }

    #[test]
    fn test_context_failure_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.blob");
        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        build(&engine, &path, "1;");

        engine.fail_context_creation(true);
        let mut timer = PhaseTimer::new();
        let outcome = SnapshotLoader::new(&engine).load(&path, &mut timer);

        assert!(matches!(
            outcome,
            LoadOutcome::Rejected(SnapError::SnapshotFormat(SnapshotFormatError::Restore { .. }))
        ));
        assert!(!timer.contains(phases::BACKING_RELEASED));
        assert_eq!(runtime.live_environments(), 0);
    }

    #[test]
    fn test_load_blob() {
        let runtime = EngineRuntime::init();
        let engine = MockEngine::new(&runtime);
        let loader = SnapshotLoader::new(&engine);

        let empty = SnapshotBlob::borrowed(&[]);
        assert!(matches!(
            loader.load_blob(&empty, &mut PhaseTimer::new()),
            LoadOutcome::Rejected(SnapError::SnapshotFormat(SnapshotFormatError::Empty))
        ));

        let bytes = b"MOCKSNAP\nlog\nfunction g(a){}".to_vec();
        let blob = SnapshotBlob::borrowed(&bytes);
        let warm = loader
            .load_blob(&blob, &mut PhaseTimer::new())
            .into_loaded()
            .unwrap();
        assert_eq!(
            warm.call(&engine, "g", &[ScriptValue::Number(9.0)]).unwrap(),
            ScriptValue::Number(10.0)
        );
    }
}
