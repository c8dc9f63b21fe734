//! Snapstart Core Library
//!
//! Warm-starts an embedded JavaScript engine from a binary snapshot.
//! Provides the snapshot builder and loader, the cold/warm bootstrapper,
//! phase timing, configuration parsing and the QuickJS engine backend.

pub mod blob;
pub mod bootstrap;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod timer;
pub mod types;

// Re-export commonly used types
pub use blob::{BackingState, BlobOwnership, SnapshotBacking, SnapshotBlob};
pub use bootstrap::{Bootstrapper, Session, StartKind};
pub use capability::{Capability, CapabilitySet, ConsoleBuffer};
pub use config::{Config, ConfigLoader, EngineConfig, SnapshotConfig};
pub use engine::{
    EngineRuntime, FunctionCodeHandling, QuickJsEngine, ScriptEngine, ScriptValue,
    SnapshotSummary,
};
pub use error::{
    BootstrapError, EngineError, HardValidationError, ScriptError, SnapError, SnapResult,
    SnapshotFormatError,
};
pub use snapshot::{BuildReport, LoadOutcome, SnapshotBuilder, SnapshotLoader, WarmEnvironment};
pub use state::{BootState, BootStateMachine};
pub use store::BlobStore;
pub use timer::{PhaseDelta, PhaseTimer};
pub use types::{CapabilityName, ScriptSource};
