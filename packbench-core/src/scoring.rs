// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Relative scoring of the strategies of one payload.
//!
//! For every compared metric each strategy holding the minimum gets +1 and
//! each holding the maximum gets -1. Ties are not broken, so when all values
//! are equal (including the single-strategy case) everyone nets 0.

use std::fmt;

use crate::metrics::MeasurementRecord;

/// A scored metric. Lower is better for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    CompressedSize,
    ArtifactSize,
    CompressTime,
    DecompressTime,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::CompressedSize,
        Metric::ArtifactSize,
        Metric::CompressTime,
        Metric::DecompressTime,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            Self::CompressedSize => "compressed",
            Self::ArtifactSize => "artifact",
            Self::CompressTime => "compress",
            Self::DecompressTime => "decompress",
        }
    }

    /// Comparable value: bytes for sizes, nanoseconds for times.
    pub fn value(&self, record: &MeasurementRecord) -> u128 {
        match self {
            Self::CompressedSize => record.compressed_size as u128,
            Self::ArtifactSize => record.artifact_size as u128,
            Self::CompressTime => record.compress_time.as_nanos(),
            Self::DecompressTime => record.decompress_time.as_nanos(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presentation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Best,
    Worst,
}

/// Score of one strategy for one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyScore {
    /// Sum of the per-metric deltas.
    pub score: i32,
    /// Per-metric markers, indexed like [`Metric::ALL`].
    pub marks: [Option<Mark>; 4],
    /// Best for the highest score, worst for the lowest, none when all tie.
    pub composite: Option<Mark>,
    /// 1-based position by score, ties kept in registration order.
    pub rank: usize,
}

impl StrategyScore {
    pub fn mark(&self, metric: Metric) -> Option<Mark> {
        Metric::ALL
            .iter()
            .position(|m| *m == metric)
            .and_then(|i| self.marks[i])
    }
}

/// Score successful strategies, given in registration order.
pub fn score(records: &[&MeasurementRecord]) -> Vec<StrategyScore> {
    let mut scores: Vec<StrategyScore> = records
        .iter()
        .map(|_| StrategyScore {
            score: 0,
            marks: [None; 4],
            composite: None,
            rank: 0,
        })
        .collect();

    if records.is_empty() {
        return scores;
    }

    for (m, metric) in Metric::ALL.iter().enumerate() {
        let values: Vec<u128> = records.iter().map(|r| metric.value(r)).collect();
        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            continue;
        };

        for (score, &value) in scores.iter_mut().zip(&values) {
            if value == min {
                score.score += 1;
            }
            if value == max {
                score.score -= 1;
            }
            if min != max {
                if value == min {
                    score.marks[m] = Some(Mark::Best);
                } else if value == max {
                    score.marks[m] = Some(Mark::Worst);
                }
            }
        }
    }

    let top = scores.iter().map(|s| s.score).max().unwrap_or(0);
    let bottom = scores.iter().map(|s| s.score).min().unwrap_or(0);
    if top != bottom {
        for score in &mut scores {
            if score.score == top {
                score.composite = Some(Mark::Best);
            } else if score.score == bottom {
                score.composite = Some(Mark::Worst);
            }
        }
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // stable: equal scores keep registration order
    order.sort_by(|a, b| scores[*b].score.cmp(&scores[*a].score));
    for (position, index) in order.into_iter().enumerate() {
        scores[index].rank = position + 1;
    }

    scores
}
