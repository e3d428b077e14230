// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-pair measurements and their collection.
//!
//! Pairs finish in any order; the collector stores outcomes keyed by
//! [`PairId`] and assembles them in corpus order by registration order once
//! the run is over.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::builder::DependencyManifest;
use crate::corpus::{Corpus, Payload};
use crate::error::PairFailure;
use crate::registry::StrategyRegistry;
use crate::scoring::{self, StrategyScore};
use crate::types::{PairId, StrategyName};

/// Measurements of one successful pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub raw_size: u64,
    pub compressed_size: u64,
    pub artifact_size: u64,
    /// Artifact bytes that are not the blob: decoder, glue, support module.
    pub runtime_size: u64,
    /// Orchestrator-side wall time of the compress step.
    pub compress_time: Duration,
    /// Decode time measured inside the sandbox.
    pub decompress_time: Duration,
    /// Bundler wall time. Reported, not scored.
    pub build_time: Duration,
}

impl MeasurementRecord {
    /// Build a record, enforcing `artifact_size >= compressed_size`.
    pub fn new(
        raw_size: u64,
        compressed_size: u64,
        artifact_size: u64,
        compress_time: Duration,
        decompress_time: Duration,
        build_time: Duration,
    ) -> Result<Self, PairFailure> {
        let runtime_size =
            artifact_size
                .checked_sub(compressed_size)
                .ok_or_else(|| PairFailure::Measurement {
                    reason: format!(
                        "artifact ({} bytes) is smaller than the blob it embeds ({} bytes)",
                        artifact_size, compressed_size
                    ),
                })?;

        Ok(Self {
            raw_size,
            compressed_size,
            artifact_size,
            runtime_size,
            compress_time,
            decompress_time,
            build_time,
        })
    }

    /// Shipped artifact size as a percentage of the raw payload.
    /// Zero for an empty payload.
    pub fn overhead_percent(&self) -> f64 {
        if self.raw_size == 0 {
            return 0.0;
        }
        self.artifact_size as f64 / self.raw_size as f64 * 100.0
    }
}

/// A successful pair with everything the report shows about it.
#[derive(Debug, Clone)]
pub struct PairRecord {
    pub measurement: MeasurementRecord,
    pub artifact_path: PathBuf,
    pub manifest: DependencyManifest,
    /// `None` when the determinism check was not requested.
    pub deterministic: Option<bool>,
}

/// Terminal state of a pair.
#[derive(Debug)]
pub enum PairOutcome {
    Success(PairRecord),
    Failed(PairFailure),
}

impl PairOutcome {
    pub fn record(&self) -> Option<&PairRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PairFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// One report row.
#[derive(Debug)]
pub struct StrategyRow {
    pub strategy: StrategyName,
    pub outcome: PairOutcome,
    /// Present for successful pairs only.
    pub score: Option<StrategyScore>,
}

/// All rows of one payload, in registration order.
#[derive(Debug)]
pub struct PayloadResults {
    pub payload: Arc<Payload>,
    pub rows: Vec<StrategyRow>,
}

/// Everything a run produced, in corpus order.
#[derive(Debug, Default)]
pub struct RunResults {
    pub payloads: Vec<PayloadResults>,
}

impl RunResults {
    pub fn rows(&self) -> impl Iterator<Item = (&Payload, &StrategyRow)> {
        self.payloads
            .iter()
            .flat_map(|p| p.rows.iter().map(move |row| (p.payload.as_ref(), row)))
    }

    pub fn pair_count(&self) -> usize {
        self.payloads.iter().map(|p| p.rows.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.rows()
            .filter(|(_, row)| row.outcome.failure().is_some())
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// Concurrent sink for pair outcomes.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    outcomes: DashMap<PairId, PairOutcome>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pair's outcome. A second outcome for the same pair replaces the
    /// first.
    pub fn record(&self, id: PairId, outcome: PairOutcome) {
        self.outcomes.insert(id, outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Drain the recorded outcomes into ordered, scored results.
    pub fn finish(&self, corpus: &Corpus, registry: &StrategyRegistry) -> RunResults {
        let mut payloads = Vec::with_capacity(corpus.len());

        for (p, payload) in corpus.payloads().iter().enumerate() {
            let mut rows: Vec<StrategyRow> = registry
                .list()
                .iter()
                .enumerate()
                .map(|(s, strategy)| {
                    let outcome = self
                        .outcomes
                        .remove(&PairId::new(p, s))
                        .map(|(_, outcome)| outcome)
                        .unwrap_or_else(|| {
                            PairOutcome::Failed(PairFailure::Measurement {
                                reason: "pair produced no outcome".to_string(),
                            })
                        });
                    StrategyRow {
                        strategy: strategy.name().clone(),
                        outcome,
                        score: None,
                    }
                })
                .collect();

            let measured: Vec<(usize, &MeasurementRecord)> = rows
                .iter()
                .enumerate()
                .filter_map(|(i, row)| row.outcome.record().map(|r| (i, &r.measurement)))
                .collect();
            let records: Vec<&MeasurementRecord> = measured.iter().map(|(_, m)| *m).collect();
            let scores = scoring::score(&records);
            let positions: Vec<usize> = measured.iter().map(|(i, _)| *i).collect();

            for (i, score) in positions.into_iter().zip(scores) {
                rows[i].score = Some(score);
            }

            payloads.push(PayloadResults {
                payload: Arc::clone(payload),
                rows,
            });
        }

        RunResults { payloads }
    }
}
