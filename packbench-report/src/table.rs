// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Console table rendering.
//!
//! One box per payload, one row per strategy in registration order. Per-metric
//! best values are suffixed with `+` and worst with `-`; the composite verdict
//! has its own column. With color enabled, best cells are green and worst red.
//! Failed pairs show dashes and are itemized below their table.

use crossterm::style::{Color, Stylize};
use packbench_core::metrics::{PairOutcome, PayloadResults, RunResults, StrategyRow};
use packbench_core::scoring::{Mark, Metric};

const HEADERS: [&str; 11] = [
    "strategy",
    "raw",
    "compressed",
    "artifact",
    "runtime",
    "compress",
    "decompress",
    "overhead",
    "score",
    "rank",
    "verdict",
];

/// A rendered cell and the marker that decides its color.
struct Cell {
    text: String,
    mark: Option<Mark>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mark: None,
        }
    }

    fn marked(text: String, mark: Option<Mark>) -> Self {
        let text = match mark {
            Some(Mark::Best) => format!("{} +", text),
            Some(Mark::Worst) => format!("{} -", text),
            None => text,
        };
        Self { text, mark }
    }
}

/// Renders run results as box-drawn tables.
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    color: bool,
}

impl TableRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Render every payload group followed by a one-line summary.
    pub fn render(&self, results: &RunResults) -> String {
        let mut out = String::new();
        for group in &results.payloads {
            out.push_str(&self.render_payload(group));
            out.push('\n');
        }
        out.push_str(&format!(
            "Total: {} pair(s), {} failed\n",
            results.pair_count(),
            results.failure_count()
        ));
        out
    }

    fn render_payload(&self, group: &PayloadResults) -> String {
        let raw = group.payload.raw_size();
        let rows: Vec<Vec<Cell>> = group.rows.iter().map(|row| cells(row, raw)).collect();

        let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.text.chars().count());
            }
        }

        let mut out = format!("{} ({})\n", group.payload.name(), format_size(raw));
        out.push_str(&border('╔', '╦', '╗', &widths));

        let header: Vec<Cell> = HEADERS.iter().map(|h| Cell::plain(*h)).collect();
        out.push_str(&self.line(&header, &widths));
        out.push_str(&border('╠', '╬', '╣', &widths));

        for row in &rows {
            out.push_str(&self.line(row, &widths));
        }
        out.push_str(&border('╚', '╩', '╝', &widths));

        for row in &group.rows {
            match &row.outcome {
                PairOutcome::Failed(failure) => {
                    out.push_str(&format!(
                        "  ✗ {}: {} - {}\n",
                        row.strategy,
                        failure.kind(),
                        failure
                    ));
                }
                PairOutcome::Success(record) if record.deterministic == Some(false) => {
                    out.push_str(&format!("  ! {}: non-deterministic build\n", row.strategy));
                }
                PairOutcome::Success(_) => {}
            }
        }

        out
    }

    fn line(&self, cells: &[Cell], widths: &[usize]) -> String {
        let mut out = String::from("║");
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            // first column left-aligned, numbers right-aligned
            let padded = if i == 0 {
                format!(" {:<width$} ", cell.text, width = width)
            } else {
                format!(" {:>width$} ", cell.text, width = width)
            };
            out.push_str(&self.paint(padded, cell.mark));
            out.push('║');
        }
        out.push('\n');
        out
    }

    fn paint(&self, text: String, mark: Option<Mark>) -> String {
        match (self.color, mark) {
            (true, Some(Mark::Best)) => text.with(Color::Green).to_string(),
            (true, Some(Mark::Worst)) => text.with(Color::Red).to_string(),
            _ => text,
        }
    }
}

fn cells(row: &StrategyRow, raw: u64) -> Vec<Cell> {
    let name = Cell::marked(
        row.strategy.to_string(),
        row.score.as_ref().and_then(|s| s.composite),
    );

    let (PairOutcome::Success(record), Some(score)) = (&row.outcome, &row.score) else {
        let mut cells = vec![name, Cell::plain(format_size(raw))];
        cells.extend((2..HEADERS.len() - 1).map(|_| Cell::plain("—")));
        cells.push(Cell::plain("failed"));
        return cells;
    };

    let m = &record.measurement;
    vec![
        name,
        Cell::plain(format_size(raw)),
        Cell::marked(
            format_size(m.compressed_size),
            score.mark(Metric::CompressedSize),
        ),
        Cell::marked(format_size(m.artifact_size), score.mark(Metric::ArtifactSize)),
        Cell::plain(format_size(m.runtime_size)),
        Cell::marked(
            format_duration_ns(m.compress_time.as_nanos() as u64),
            score.mark(Metric::CompressTime),
        ),
        Cell::marked(
            format_duration_ns(m.decompress_time.as_nanos() as u64),
            score.mark(Metric::DecompressTime),
        ),
        Cell::plain(format!("{:.1}%", m.overhead_percent())),
        Cell::plain(format!("{:+}", score.score)),
        Cell::plain(score.rank.to_string()),
        Cell {
            text: match score.composite {
                Some(Mark::Best) => "BEST".to_string(),
                Some(Mark::Worst) => "WORST".to_string(),
                None => String::new(),
            },
            mark: score.composite,
        },
    ]
}

fn border(left: char, mid: char, right: char, widths: &[usize]) -> String {
    let mut out = String::new();
    out.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push(mid);
        }
        out.push_str(&"═".repeat(width + 2));
    }
    out.push(right);
    out.push('\n');
    out
}

/// Format a byte count (B/KB/MB, decimal units).
pub fn format_size(bytes: u64) -> String {
    if bytes < 1_000 {
        format!("{} B", bytes)
    } else if bytes < 1_000_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    }
}

/// Format a duration in nanoseconds (auto-selects ns/μs/ms/s).
pub fn format_duration_ns(ns: u64) -> String {
    if ns < 1_000 {
        format!("{}ns", ns)
    } else if ns < 1_000_000 {
        format!("{:.2}μs", ns as f64 / 1_000.0)
    } else if ns < 1_000_000_000 {
        format!("{:.2}ms", ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", ns as f64 / 1_000_000_000.0)
    }
}
