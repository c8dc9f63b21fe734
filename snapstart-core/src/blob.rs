// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Snapshot blobs and the buffer that backs them during a load.
//!
//! A [`SnapshotBlob`] is either borrowed from a caller-owned buffer or owned
//! by the engine after serialization. When an environment is restored from a
//! borrowed blob, the buffer lives in a [`SnapshotBacking`] guard that must
//! stay pinned until the default scope has been derived.

use std::borrow::Cow;

use crate::error::OwnershipError;

/// Who keeps the blob's bytes alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOwnership {
    /// The caller owns the buffer and must keep it alive.
    Borrowed,
    /// Produced by serialization; released after being written out.
    EngineOwned,
}

/// Contiguous snapshot bytes. The core never looks inside; it only moves the
/// bytes around and checks they are non-empty.
#[derive(Debug, Clone)]
pub struct SnapshotBlob<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> SnapshotBlob<'a> {
    pub fn borrowed(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A blob is only worth handing to the engine when it has content.
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn ownership(&self) -> BlobOwnership {
        match self.data {
            Cow::Borrowed(_) => BlobOwnership::Borrowed,
            Cow::Owned(_) => BlobOwnership::EngineOwned,
        }
    }
}

impl SnapshotBlob<'static> {
    pub fn owned(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
        }
    }

    /// Free an engine-owned blob once it has been written out. Returns the
    /// number of bytes released.
    pub fn release(self) -> usize {
        let len = self.data.len();
        tracing::trace!(bytes = len, "Released engine-owned snapshot blob");
        len
    }
}

/// Lifecycle of the buffer behind a borrowed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingState {
    /// Read from disk, not yet handed to the engine.
    Loaded,
    /// An environment is being built from the buffer.
    Pinned,
    /// The default scope has been derived; the buffer is no longer needed.
    Consumed,
    /// The buffer has been freed.
    Released,
}

impl BackingState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Pinned => "Pinned",
            Self::Consumed => "Consumed",
            Self::Released => "Released",
        }
    }
}

/// Owner of the snapshot bytes read from disk.
///
/// `pin` before restoring an environment, `unpin` once the default scope
/// exists, then `release`. Releasing while pinned is refused.
#[derive(Debug)]
pub struct SnapshotBacking {
    bytes: Vec<u8>,
    state: BackingState,
}

impl SnapshotBacking {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            state: BackingState::Loaded,
        }
    }

    pub fn state(&self) -> BackingState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the bytes as a blob. Empty once released.
    pub fn blob(&self) -> SnapshotBlob<'_> {
        SnapshotBlob::borrowed(&self.bytes)
    }

    /// Mark the buffer as in use by an environment under construction.
    pub fn pin(&mut self) -> Result<(), OwnershipError> {
        match self.state {
            BackingState::Loaded => {
                self.state = BackingState::Pinned;
                Ok(())
            }
            BackingState::Released => Err(OwnershipError::AlreadyReleased),
            other => Err(OwnershipError::InvalidState {
                operation: "pin",
                state: other.name(),
            }),
        }
    }

    /// The dependent environment no longer needs the buffer.
    pub fn unpin(&mut self) -> Result<(), OwnershipError> {
        match self.state {
            BackingState::Pinned => {
                self.state = BackingState::Consumed;
                Ok(())
            }
            BackingState::Released => Err(OwnershipError::AlreadyReleased),
            other => Err(OwnershipError::InvalidState {
                operation: "unpin",
                state: other.name(),
            }),
        }
    }

    /// Free the buffer. Returns the number of bytes released.
    pub fn release(&mut self) -> Result<usize, OwnershipError> {
        match self.state {
            BackingState::Pinned => Err(OwnershipError::ReleasedWhilePinned),
            BackingState::Released => Err(OwnershipError::AlreadyReleased),
            BackingState::Loaded | BackingState::Consumed => {
                let len = self.bytes.len();
                self.bytes = Vec::new();
                self.state = BackingState::Released;
                tracing::trace!(bytes = len, "Released snapshot backing buffer");
                Ok(len)
            }
        }
    }
}

impl Drop for SnapshotBacking {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.state != BackingState::Pinned,
                "snapshot backing dropped while an environment depends on it"
            );
        }
    }
}
