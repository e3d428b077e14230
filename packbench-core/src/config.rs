// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Everything is validated before the first pair starts. Any invalid field
//! results in a ConfigurationError that prevents the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BenchError, BenchResult, ConfigurationError};
use crate::strategy::StrategyKind;
use crate::types::{CompressionLevel, StrategyName};

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "packbench.yaml";

/// Raw strategy entry as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawStrategyConfig {
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    level: Option<u32>,
}

/// Raw bundler configuration.
#[derive(Debug, Deserialize)]
struct RawBundlerConfig {
    #[serde(default = "default_bundler_program")]
    program: String,
    #[serde(default = "default_working_dir")]
    working_dir: String,
    #[serde(default = "default_target")]
    target: String,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default = "default_platform")]
    platform: String,
    #[serde(default = "default_bundler_concurrency")]
    concurrency: usize,
}

fn default_bundler_program() -> String {
    "esbuild".to_string()
}

fn default_working_dir() -> String {
    ".".to_string()
}

fn default_target() -> String {
    "es2020".to_string()
}

fn default_format() -> String {
    "iife".to_string()
}

fn default_platform() -> String {
    "browser".to_string()
}

fn default_bundler_concurrency() -> usize {
    1 // bundler runs are CPU bound; serialize by default
}

impl Default for RawBundlerConfig {
    fn default() -> Self {
        Self {
            program: default_bundler_program(),
            working_dir: default_working_dir(),
            target: default_target(),
            format: default_format(),
            platform: default_platform(),
            concurrency: default_bundler_concurrency(),
        }
    }
}

/// Raw sandbox configuration.
#[derive(Debug, Deserialize)]
struct RawSandboxConfig {
    #[serde(default = "default_sandbox_program")]
    program: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_sandbox_concurrency")]
    concurrency: usize,
}

fn default_sandbox_program() -> String {
    "node".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_sandbox_concurrency() -> usize {
    4
}

impl Default for RawSandboxConfig {
    fn default() -> Self {
        Self {
            program: default_sandbox_program(),
            timeout_ms: default_timeout_ms(),
            concurrency: default_sandbox_concurrency(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_corpus_dir")]
    corpus_dir: String,
    #[serde(default = "default_output_dir")]
    output_dir: String,
    #[serde(default)]
    strategies: Option<Vec<RawStrategyConfig>>,
    #[serde(default)]
    bundler: RawBundlerConfig,
    #[serde(default)]
    sandbox: RawSandboxConfig,
}

fn default_corpus_dir() -> String {
    "json".to_string()
}

fn default_output_dir() -> String {
    ".packbench".to_string()
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            output_dir: default_output_dir(),
            strategies: None,
            bundler: RawBundlerConfig::default(),
            sandbox: RawSandboxConfig::default(),
        }
    }
}

/// Validated strategy entry.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub name: StrategyName,
    pub level: CompressionLevel,
}

/// Output module format handed to the bundler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Iife,
    Cjs,
    Esm,
}

impl BundleFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Iife => "iife",
            Self::Cjs => "cjs",
            Self::Esm => "esm",
        }
    }
}

/// Validated bundler configuration.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    pub program: String,
    /// Directory the bundler runs in; npm packages resolve from its node_modules.
    pub working_dir: PathBuf,
    pub target: String,
    pub format: BundleFormat,
    pub platform: String,
    pub concurrency: usize,
}

/// Validated sandbox configuration.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub program: String,
    pub timeout: Duration,
    pub concurrency: usize,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_dir: PathBuf,
    pub output_dir: PathBuf,
    pub strategies: Vec<StrategyConfig>,
    pub bundler: BundlerConfig,
    pub sandbox: SandboxConfig,
}

impl Config {
    /// Keep only the named strategies, preserving configured order.
    pub fn retain_strategies(&mut self, names: &[String]) -> Result<(), ConfigurationError> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            if !self.strategies.iter().any(|s| s.name.as_str() == name) {
                return Err(ConfigurationError::InvalidFieldValue {
                    field: "strategy",
                    value: name.clone(),
                    reason: "No configured strategy has this name".to_string(),
                });
            }
        }

        self.strategies
            .retain(|s| names.iter().any(|n| n == s.name.as_str()));
        Ok(())
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load an explicitly named file, or fall back to [`DEFAULT_CONFIG_FILE`]
    /// if present, or to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> BenchResult<Config> {
        match path {
            Some(path) => Self::load_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load_file(DEFAULT_CONFIG_FILE),
            None => Self::validate(RawConfig::default()),
        }
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<Config> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Self::validate(RawConfig::default());
        }

        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> BenchResult<Config> {
        if raw.corpus_dir.trim().is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "corpus_dir",
                value: raw.corpus_dir,
                reason: "Corpus directory cannot be empty".to_string(),
            }
            .into());
        }

        if raw.output_dir.trim().is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "output_dir",
                value: raw.output_dir,
                reason: "Output directory cannot be empty".to_string(),
            }
            .into());
        }

        let strategies = match raw.strategies {
            Some(entries) => {
                let mut strategies = Vec::with_capacity(entries.len());
                for entry in entries {
                    strategies.push(Self::validate_strategy(entry)?);
                }
                strategies
            }
            None => StrategyKind::ALL
                .iter()
                .map(|kind| {
                    Ok(StrategyConfig {
                        kind: *kind,
                        name: StrategyName::new(kind.as_str())?,
                        level: CompressionLevel::DEFAULT,
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?,
        };

        if strategies.is_empty() {
            return Err(ConfigurationError::NoStrategies.into());
        }

        Ok(Config {
            corpus_dir: PathBuf::from(raw.corpus_dir),
            output_dir: PathBuf::from(raw.output_dir),
            strategies,
            bundler: Self::validate_bundler(raw.bundler)?,
            sandbox: Self::validate_sandbox(raw.sandbox)?,
        })
    }

    /// Validate a single strategy entry. Name defaults to the kind.
    fn validate_strategy(raw: RawStrategyConfig) -> Result<StrategyConfig, ConfigurationError> {
        let kind: StrategyKind = raw.kind.parse()?;
        let name = StrategyName::new(raw.name.unwrap_or_else(|| kind.as_str().to_string()))?;
        let level = match raw.level {
            Some(level) => CompressionLevel::new(level)?,
            None => CompressionLevel::DEFAULT,
        };

        Ok(StrategyConfig { kind, name, level })
    }

    fn validate_bundler(raw: RawBundlerConfig) -> Result<BundlerConfig, ConfigurationError> {
        if raw.program.trim().is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "bundler.program",
                value: raw.program,
                reason: "Bundler program cannot be empty".to_string(),
            });
        }

        let format = match raw.format.as_str() {
            "iife" => BundleFormat::Iife,
            "cjs" => BundleFormat::Cjs,
            "esm" => BundleFormat::Esm,
            other => {
                return Err(ConfigurationError::InvalidFieldValue {
                    field: "bundler.format",
                    value: other.to_string(),
                    reason: "Must be one of iife, cjs, esm".to_string(),
                })
            }
        };

        if !matches!(raw.platform.as_str(), "browser" | "node" | "neutral") {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "bundler.platform",
                value: raw.platform,
                reason: "Must be one of browser, node, neutral".to_string(),
            });
        }

        Self::validate_concurrency("bundler.concurrency", raw.concurrency)?;

        Ok(BundlerConfig {
            program: raw.program,
            working_dir: PathBuf::from(raw.working_dir),
            target: raw.target,
            format,
            platform: raw.platform,
            concurrency: raw.concurrency,
        })
    }

    fn validate_sandbox(raw: RawSandboxConfig) -> Result<SandboxConfig, ConfigurationError> {
        if raw.program.trim().is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "sandbox.program",
                value: raw.program,
                reason: "Sandbox program cannot be empty".to_string(),
            });
        }

        if raw.timeout_ms == 0 {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "sandbox.timeout_ms",
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if raw.timeout_ms > 600_000 {
            // 10 minutes max
            return Err(ConfigurationError::InvalidFieldValue {
                field: "sandbox.timeout_ms",
                value: raw.timeout_ms.to_string(),
                reason: "Timeout must not exceed 10 minutes (600000ms)".to_string(),
            });
        }

        Self::validate_concurrency("sandbox.concurrency", raw.concurrency)?;

        Ok(SandboxConfig {
            program: raw.program,
            timeout: Duration::from_millis(raw.timeout_ms),
            concurrency: raw.concurrency,
        })
    }

    fn validate_concurrency(field: &'static str, value: usize) -> Result<(), ConfigurationError> {
        if value == 0 || value > 256 {
            return Err(ConfigurationError::InvalidFieldValue {
                field,
                value: value.to_string(),
                reason: "Must be between 1 and 256".to_string(),
            });
        }
        Ok(())
    }
}
