// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Snapshot capture and restore.
//!
//! [`SnapshotBuilder`] turns a script into a snapshot file.
//! [`SnapshotLoader`] turns a snapshot file back into a live environment
//! and reports missing or invalid files as a [`LoadOutcome`] instead of
//! an error.

mod builder;
mod loader;

pub use builder::{BuildReport, SnapshotBuilder};
pub use loader::{LoadOutcome, SnapshotLoader, WarmEnvironment};

/// Phase names recorded on the [`crate::PhaseTimer`].
pub mod phases {
    pub const ENVIRONMENT_CREATED: &str = "environment_created";
    pub const SCOPE_OPENED: &str = "scope_opened";
    pub const CAPABILITIES_BOUND: &str = "capabilities_bound";
    pub const SCRIPT_COMPILED: &str = "script_compiled";
    pub const SCOPE_REGISTERED: &str = "scope_registered";
    pub const SNAPSHOT_SERIALIZED: &str = "snapshot_serialized";
    pub const SNAPSHOT_WRITTEN: &str = "snapshot_written";

    pub const SNAPSHOT_READ: &str = "snapshot_read";
    pub const ENVIRONMENT_RESTORED: &str = "environment_restored";
    pub const CONTEXT_CREATED: &str = "context_created";
    pub const BACKING_RELEASED: &str = "backing_released";

    pub const SCRIPT_READ: &str = "script_read";
    pub const CAPABILITIES_REBOUND: &str = "capabilities_rebound";

    pub const FUNCTION_CALLED: &str = "function_called";
}
