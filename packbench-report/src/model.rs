// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Serializable report model.
//!
//! Mirrors [`RunResults`] with plain numbers (bytes, nanoseconds) so the JSON
//! stays stable regardless of how the core represents durations.

use chrono::{DateTime, Utc};
use packbench_core::builder::ManifestInput;
use packbench_core::metrics::{PairOutcome, RunResults, StrategyRow};
use packbench_core::scoring::{Mark, Metric, StrategyScore};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

/// System information captured at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub memory_bytes: u64,
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Measurements of a successful pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub compressed_bytes: u64,
    pub artifact_bytes: u64,
    pub runtime_bytes: u64,
    pub compress_ns: u64,
    pub decompress_ns: u64,
    pub build_ns: u64,
    pub overhead_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deterministic: Option<bool>,
    pub artifact_path: String,
    pub dependencies: Vec<ManifestInput>,
}

/// Relative score of a successful pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: i32,
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<String>,
    /// Metrics this strategy holds the minimum for.
    pub best: Vec<String>,
    /// Metrics this strategy holds the maximum for.
    pub worst: Vec<String>,
}

impl From<&StrategyScore> for ScoreReport {
    fn from(score: &StrategyScore) -> Self {
        let with_mark = |mark: Mark| -> Vec<String> {
            Metric::ALL
                .iter()
                .filter(|m| score.mark(**m) == Some(mark))
                .map(|m| m.label().to_string())
                .collect()
        };

        Self {
            score: score.score,
            rank: score.rank,
            composite: score.composite.map(mark_label),
            best: with_mark(Mark::Best),
            worst: with_mark(Mark::Worst),
        }
    }
}

/// Why a pair failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: String,
    pub message: String,
}

/// One strategy row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowReport {
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<MeasurementReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
}

impl From<&StrategyRow> for RowReport {
    fn from(row: &StrategyRow) -> Self {
        let (measurement, failure) = match &row.outcome {
            PairOutcome::Success(record) => {
                let m = &record.measurement;
                (
                    Some(MeasurementReport {
                        compressed_bytes: m.compressed_size,
                        artifact_bytes: m.artifact_size,
                        runtime_bytes: m.runtime_size,
                        compress_ns: m.compress_time.as_nanos() as u64,
                        decompress_ns: m.decompress_time.as_nanos() as u64,
                        build_ns: m.build_time.as_nanos() as u64,
                        overhead_percent: m.overhead_percent(),
                        deterministic: record.deterministic,
                        artifact_path: record.artifact_path.display().to_string(),
                        dependencies: record.manifest.inputs.clone(),
                    }),
                    None,
                )
            }
            PairOutcome::Failed(failure) => (
                None,
                Some(FailureReport {
                    kind: failure.kind().to_string(),
                    message: failure.to_string(),
                }),
            ),
        };

        Self {
            strategy: row.strategy.to_string(),
            measurement,
            score: row.score.as_ref().map(ScoreReport::from),
            failure,
        }
    }
}

/// All rows for one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadReport {
    pub name: String,
    pub raw_bytes: u64,
    pub rows: Vec<RowReport>,
}

/// Complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub suite: String,
    pub version: String,
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub pairs: usize,
    pub failures: usize,
    pub payloads: Vec<PayloadReport>,
}

impl BenchReport {
    /// Snapshot a finished run.
    pub fn from_results(results: &RunResults) -> Self {
        Self {
            suite: "packbench".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            pairs: results.pair_count(),
            failures: results.failure_count(),
            payloads: results
                .payloads
                .iter()
                .map(|p| PayloadReport {
                    name: p.payload.name().to_string(),
                    raw_bytes: p.payload.raw_size(),
                    rows: p.rows.iter().map(RowReport::from).collect(),
                })
                .collect(),
        }
    }
}

pub(crate) fn mark_label(mark: Mark) -> String {
    match mark {
        Mark::Best => "best".to_string(),
        Mark::Worst => "worst".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_results() {
        let report = BenchReport::from_results(&fixtures::results());
        assert_eq!(report.pairs, 3);
        assert_eq!(report.failures, 1);

        let rows = &report.payloads[0].rows;
        assert_eq!(rows[0].strategy, "pako");
        let m = rows[0].measurement.as_ref().unwrap();
        assert_eq!(m.runtime_bytes, 2_000);
        assert_eq!(m.decompress_ns, 3_000_000);

        let failure = rows[2].failure.as_ref().unwrap();
        assert_eq!(failure.kind, "timeout");
        assert!(rows[2].score.is_none());
    }

    #[test]
    fn test_score_report_marks() {
        let report = BenchReport::from_results(&fixtures::results());
        let pako = report.payloads[0].rows[0].score.as_ref().unwrap();
        let base64 = report.payloads[0].rows[1].score.as_ref().unwrap();

        // pako: smaller on both sizes, slower to decode; compress times tie
        assert_eq!(pako.best, vec!["compressed", "artifact"]);
        assert_eq!(pako.worst, vec!["decompress"]);
        assert_eq!(pako.score, 1);
        assert_eq!(pako.composite.as_deref(), Some("best"));
        assert_eq!(base64.composite.as_deref(), Some("worst"));
        assert_eq!(pako.rank, 1);
    }

    #[test]
    fn test_system_info_collect() {
        let info = SystemInfo::collect();
        assert!(!info.os.is_empty());
        assert!(info.cpu_cores > 0);
    }

    #[test]
    fn test_report_serialization() {
        let report = BenchReport::from_results(&fixtures::results());
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"run_id\""));
        assert!(json.contains("\"timeout\""));
        assert!(json.contains("\"runtime_bytes\": 2000"));
        assert!(!json.contains("\"deterministic\""));
    }
}
