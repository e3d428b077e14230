// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Validated strategy name.
/// Must be non-empty, alphanumeric with hyphens/underscores, max 64 chars.
/// The name ends up in scratch file names and generated import paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StrategyName(String);

impl StrategyName {
    /// Create a new StrategyName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "strategy_name",
                value: name,
                reason: "Strategy name cannot be empty".to_string(),
            });
        }

        if name.len() > 64 {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "strategy_name",
                value: name.clone(),
                reason: format!("Strategy name too long: {} chars (max 64)", name.len()),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "strategy_name",
                value: name,
                reason: "Strategy name must contain only ASCII alphanumeric characters, hyphens, and underscores".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StrategyName {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StrategyName> for String {
    fn from(name: StrategyName) -> Self {
        name.0
    }
}

/// Validated deflate compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Level used when a strategy does not specify one (zlib's default).
    pub const DEFAULT: Self = Self(6);

    /// Create a new CompressionLevel with bounds validation.
    pub fn new(level: u32) -> Result<Self, ConfigurationError> {
        if level > 9 {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "level",
                value: level.to_string(),
                reason: "Compression level must be between 0 and 9".to_string(),
            });
        }
        Ok(Self(level))
    }

    /// Get the inner level.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for CompressionLevel {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompressionLevel> for u32 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

/// Position of a (payload, strategy) pair in the run matrix.
///
/// Both indices are enumeration positions: corpus order and registration
/// order. Report ordering is derived from them, never from completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairId {
    pub payload: usize,
    pub strategy: usize,
}

impl PairId {
    pub fn new(payload: usize, strategy: usize) -> Self {
        Self { payload, strategy }
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}/s{}", self.payload, self.strategy)
    }
}
