// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON report files.
//!
//! Reports are written either to an explicit path or, timestamped, into an
//! output directory so successive runs do not overwrite each other.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::BenchReport;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON reporter for run results.
pub struct JsonReporter {
    output_dir: PathBuf,
}

impl JsonReporter {
    /// Create a reporter writing into `output_dir`, creating it if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Save a report as `packbench_<timestamp>.json`.
    ///
    /// Returns the path to the created file.
    pub fn save(&self, report: &BenchReport) -> Result<PathBuf, ReporterError> {
        let timestamp = report.timestamp.format("%Y-%m-%dT%H-%M-%SZ");
        let filepath = self
            .output_dir
            .join(format!("packbench_{}.json", timestamp));
        Self::write_to(&filepath, report)?;
        Ok(filepath)
    }

    /// Write a report to an explicit path.
    pub fn write_to(path: impl AsRef<Path>, report: &BenchReport) -> Result<(), ReporterError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, report)?;
        Ok(())
    }

    /// Load an existing report.
    pub fn load(path: impl AsRef<Path>) -> Result<BenchReport, ReporterError> {
        let file = File::open(path)?;
        let report = serde_json::from_reader(file)?;
        Ok(report)
    }
}
