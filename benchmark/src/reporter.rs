// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON report generation for benchmark results.
//!
//! Reports are written atomically through the snapshot blob store so a
//! crashed run never leaves a half-written JSON file behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use snapstart_core::{BlobStore, SnapError};
use thiserror::Error;

use crate::metrics::BenchmarkReport;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to access output directory: {0}")]
    Directory(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write report: {0}")]
    Write(#[from] SnapError),
}

/// JSON reporter for benchmark results.
pub struct JsonReporter {
    output_dir: PathBuf,
}

impl JsonReporter {
    /// Create a new JSON reporter with the specified output directory.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Create a reporter using the crate's `data` directory.
    pub fn default_location() -> Result<Self, ReporterError> {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save a report as `snapstart_<timestamp>.json`. Returns the file path.
    pub fn save(&self, report: &BenchmarkReport) -> Result<PathBuf, ReporterError> {
        let filename = format!(
            "snapstart_{}.json",
            report.timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ")
        );
        let filepath = self.output_dir.join(filename);

        let json = serde_json::to_vec_pretty(report)?;
        BlobStore::write_atomic(&json, &filepath)?;
        Ok(filepath)
    }

    /// List all existing benchmark files in the output directory, oldest first.
    pub fn list_reports(&self) -> Result<Vec<PathBuf>, ReporterError> {
        let mut reports = Vec::new();
        for entry in fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                reports.push(path);
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Load an existing benchmark report from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<BenchmarkReport, ReporterError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Most recent report in the output directory, if any.
    pub fn latest(&self) -> Result<Option<BenchmarkReport>, ReporterError> {
        match self.list_reports()?.last() {
            Some(path) => Ok(Some(Self::load(path)?)),
            None => Ok(None),
        }
    }
}
