// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! packbench reporting
//!
//! Turns finished run results into a timestamped JSON report (with run id and
//! system information) and a ranked console table.

pub mod json;
pub mod model;
pub mod table;

pub use json::{JsonReporter, ReporterError};
pub use model::{BenchReport, PayloadReport, RowReport, SystemInfo};
pub use table::TableRenderer;
