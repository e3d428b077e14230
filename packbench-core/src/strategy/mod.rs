// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Pluggable compression strategies.
//!
//! A strategy compresses a payload on the orchestrator side into a text blob
//! that can be embedded as a string literal, and generates the JavaScript entry
//! module that decodes that blob inside the sandbox, times itself, and publishes
//! `{ duration, value }` to the well-known result slot.

mod builtin;
mod codec;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigurationError, StrategyError};
use crate::sandbox::RESULT_SLOT;
use crate::types::{CompressionLevel, StrategyName};

pub use builtin::{
    Base64Strategy, FflateStrategy, LzStringStrategy, PakoStrategy, TinyInflateStrategy,
    UzipStrategy,
};

/// File name of the helper module every generated entry imports.
pub const SUPPORT_MODULE: &str = "packbench-support.js";

/// A compression scheme under comparison.
///
/// Implementations must be stateless across payloads: the orchestrator calls
/// them concurrently from several pairs.
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Unique name; doubles as the report row label and scratch file prefix.
    fn name(&self) -> &StrategyName;

    /// Compress a payload into an embeddable text blob.
    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError>;

    /// Generate the sandbox entry module.
    ///
    /// `blob_module` is the relative import path of a module whose default
    /// export is the blob string.
    fn generate_source(&self, blob_module: &str) -> String;

    /// Reference decoder used for the orchestrator-side self-check.
    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError>;
}

/// Source of the helper module shared by all generated entries.
pub fn support_module_source() -> String {
    format!(
        r#"export function base64ToUint8(b64) {{
    const bin = atob(b64);
    const out = new Uint8Array(bin.length);
    for (let i = 0; i < bin.length; i++) {{
        out[i] = bin.charCodeAt(i);
    }}
    return out;
}}

export function uint8ToString(u8a) {{
    return new TextDecoder('utf-8', {{ ignoreBOM: true }}).decode(u8a);
}}

export function publish(start, value) {{
    const duration = performance.now() - start;
    window.{slot} = {{ duration, value }};
}}
"#,
        slot = RESULT_SLOT
    )
}

/// Import statement pulling the blob module in as `blob`.
pub(crate) fn blob_import(blob_module: &str) -> String {
    // JSON string literals are valid JS string literals
    let literal = serde_json::to_string(blob_module).unwrap_or_else(|_| "\"\"".to_string());
    format!("import blob from {};", literal)
}

/// Built-in strategy catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Plain base64, no compression. Baseline for the size columns.
    Base64,
    /// zlib container, decoded by `pako`.
    Pako,
    /// raw deflate, decoded by `uzip`.
    Uzip,
    /// gzip container, decoded by `fflate`.
    Fflate,
    /// raw deflate with a length prefix, decoded by `tiny-inflate`.
    TinyInflate,
    /// LZ-based string packing, decoded by `lz-string`. Ignores the level.
    LzString,
}

impl StrategyKind {
    /// Every built-in kind, in default registration order.
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Base64,
        StrategyKind::Pako,
        StrategyKind::Uzip,
        StrategyKind::Fflate,
        StrategyKind::TinyInflate,
        StrategyKind::LzString,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Pako => "pako",
            Self::Uzip => "uzip",
            Self::Fflate => "fflate",
            Self::TinyInflate => "tiny-inflate",
            Self::LzString => "lz-string",
        }
    }

    /// npm package the generated source imports, if any.
    pub const fn npm_package(&self) -> Option<&'static str> {
        match self {
            Self::Base64 => None,
            Self::Pako => Some("pako"),
            Self::Uzip => Some("uzip"),
            Self::Fflate => Some("fflate"),
            Self::TinyInflate => Some("tiny-inflate"),
            Self::LzString => Some("lz-string"),
        }
    }

    /// Construct a strategy of this kind.
    pub fn instantiate(&self, name: StrategyName, level: CompressionLevel) -> Arc<dyn Strategy> {
        match self {
            Self::Base64 => Arc::new(Base64Strategy::new(name)),
            Self::Pako => Arc::new(PakoStrategy::new(name, level)),
            Self::Uzip => Arc::new(UzipStrategy::new(name, level)),
            Self::Fflate => Arc::new(FflateStrategy::new(name, level)),
            Self::TinyInflate => Arc::new(TinyInflateStrategy::new(name, level)),
            Self::LzString => Arc::new(LzStringStrategy::new(name)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigurationError::UnknownStrategyKind {
                kind: s.to_string(),
                known: Self::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
