// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Whole-file binary I/O for snapshot files and script sources.

use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{SnapError, SnapResult};

/// Suffix appended to the target file name for in-flight atomic writes.
const TEMP_SUFFIX: &str = ".tmp";

/// Stateless file primitives used by the builder, the loader and the CLI.
pub struct BlobStore;

impl BlobStore {
    /// Read a file fully. An empty file yields an empty buffer.
    pub fn read_all(path: impl AsRef<Path>) -> SnapResult<Vec<u8>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| io_error("opening file", path, e))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| io_error("reading file", path, e))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read file");
        Ok(bytes)
    }

    /// Write a buffer to a file, replacing any previous content. Data is
    /// flushed and synced before returning.
    pub fn write_all(bytes: &[u8], path: impl AsRef<Path>) -> SnapResult<()> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|e| io_error("creating file", path, e))?;

        file.write_all(bytes)
            .map_err(|e| io_error("writing file", path, e))?;
        file.flush().map_err(|e| io_error("flushing file", path, e))?;
        file.sync_all()
            .map_err(|e| io_error("syncing file", path, e))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
        Ok(())
    }

    /// Non-throwing existence check.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Write through a sibling temp file and rename it over the target.
    ///
    /// Readers observe either the previous file or the complete new one.
    /// The temp file never outlives a failed write.
    pub fn write_atomic(bytes: &[u8], path: impl AsRef<Path>) -> SnapResult<()> {
        let path = path.as_ref();
        let temp_path = Self::temp_path(path);

        tracing::debug!(
            final_path = %path.display(),
            temp_path = %temp_path.display(),
            "Starting atomic write"
        );

        if temp_path.exists() {
            tracing::warn!(path = %temp_path.display(), "Removing stale temp file");
            let _ = std::fs::remove_file(&temp_path);
        }

        if let Err(e) = Self::write_all(bytes, &temp_path) {
            tracing::warn!(
                temp_path = %temp_path.display(),
                error = %e,
                "Write failed, cleaning up temp file"
            );
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        match std::fs::rename(&temp_path, path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Atomic rename completed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    temp_path = %temp_path.display(),
                    error = %e,
                    "Rename failed, cleaning up temp file"
                );
                let _ = std::fs::remove_file(&temp_path);
                Err(io_error("renaming temp file", path, e))
            }
        }
    }

    /// Sibling temp path for an atomic write: `snapshot.blob` → `snapshot.blob.tmp`.
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(TEMP_SUFFIX);
        path.with_file_name(name)
    }
}

fn io_error(context: &'static str, path: &Path, source: std::io::Error) -> SnapError {
    SnapError::Io {
        context,
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");

        BlobStore::write_all(&[1, 2, 3], &path).unwrap();
        assert_eq!(BlobStore::read_all(&path).unwrap(), vec![1, 2, 3]);

        // Overwrite with shorter content
        BlobStore::write_all(&[9], &path).unwrap();
        assert_eq!(BlobStore::read_all(&path).unwrap(), vec![9]);
    }

    #[test]
    fn test_read_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        assert!(BlobStore::read_all(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = BlobStore::read_all(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, SnapError::Io { .. }));
    }

    #[test]
    fn test_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        assert!(!BlobStore::exists(&path));
        // A directory is not a snapshot file
        assert!(!BlobStore::exists(dir.path()));

        BlobStore::write_all(b"x", &path).unwrap();
        assert!(BlobStore::exists(&path));
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.blob");

        BlobStore::write_all(b"old", &path).unwrap();
        BlobStore::write_atomic(b"new contents", &path).unwrap();

        assert_eq!(BlobStore::read_all(&path).unwrap(), b"new contents");
        assert!(!BlobStore::temp_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_removes_stale_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.blob");
        let temp = BlobStore::temp_path(&path);
        BlobStore::write_all(b"stale", &temp).unwrap();

        BlobStore::write_atomic(b"fresh", &path).unwrap();
        assert_eq!(BlobStore::read_all(&path).unwrap(), b"fresh");
        assert!(!temp.exists());
    }

    #[test]
    fn test_write_atomic_failure_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("snapshot.blob");

        assert!(BlobStore::write_atomic(b"data", &path).is_err());
        assert!(!path.exists());
        assert!(!BlobStore::temp_path(&path).exists());
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = BlobStore::temp_path(Path::new("/var/snap/snapshot.blob"));
        assert_eq!(temp, PathBuf::from("/var/snap/snapshot.blob.tmp"));
    }
}
