//! Custom error types for packbench.
//!
//! Run-level failures live in [`BenchError`] and abort the run. Everything that
//! can go wrong for a single (payload, strategy) pair is a [`PairFailure`] and
//! is recorded, never propagated past the pair boundary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for a benchmark run.
/// Only configuration problems and unrecoverable resource failures end up here.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast before any pair starts
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Corpus Errors
    // =========================================================================
    #[error("Corpus directory not found: {path}")]
    CorpusNotFound { path: PathBuf },

    #[error("Corpus directory {path} contains no payload files")]
    EmptyCorpus { path: PathBuf },

    #[error("Payload {name} is not valid UTF-8 (first bad byte at offset {offset})")]
    InvalidPayload { name: String, offset: usize },

    // =========================================================================
    // Resource Errors - the sandbox engine or scratch storage is unusable
    // =========================================================================
    #[error("Sandbox engine unavailable: {0}")]
    Engine(#[from] SandboxError),

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Duplicate strategy name: {name}")]
    DuplicateStrategy { name: String },

    #[error("Unknown strategy kind: {kind} (known: {known})")]
    UnknownStrategyKind { kind: String, known: String },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("At least one strategy must be registered")]
    NoStrategies,
}

/// Errors raised by a strategy's own encode/decode step.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{strategy}: compression failed - {source}")]
    Compress {
        strategy: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{strategy}: reference decode failed - {reason}")]
    Decode { strategy: String, reason: String },
}

/// The bundler could not produce an artifact for a pair.
#[derive(Debug, Error)]
pub enum BuildFailure {
    #[error("Failed to spawn bundler '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Bundler exited with {status}: {diagnostic}")]
    Toolchain { status: String, diagnostic: String },

    #[error("Bundler reported success but produced no artifact at {path}")]
    MissingArtifact { path: PathBuf },

    #[error("Dependency manifest at {path} is unreadable: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Sandbox engine and context failures.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to launch sandbox engine: {reason}")]
    LaunchFailed { reason: String },

    #[error("Sandbox did not publish a result within {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("Sandbox crashed: {reason}")]
    Crash { reason: String },

    #[error("Sandbox protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Sandbox engine is closed")]
    EngineClosed,
}

/// Decompressed output did not match the original payload.
#[derive(Debug, Error)]
#[error("Round-trip mismatch: {diagnostic} (output saved to {})", .dump_path.display())]
pub struct VerificationMismatch {
    pub diagnostic: String,
    pub dump_path: PathBuf,
}

/// Terminal failure of a single (payload, strategy) pair.
#[derive(Debug, Error)]
pub enum PairFailure {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Build(#[from] BuildFailure),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Verification(#[from] VerificationMismatch),

    #[error("Measurement invariant violated: {reason}")]
    Measurement { reason: String },

    #[error("Pair task aborted: {reason}")]
    Aborted { reason: String },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PairFailure {
    /// Short label for report columns.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Strategy(_) => "strategy",
            Self::Build(_) => "build",
            Self::Sandbox(SandboxError::Timeout { .. }) => "timeout",
            Self::Sandbox(_) => "crash",
            Self::Verification(_) => "mismatch",
            Self::Measurement { .. } => "measurement",
            Self::Aborted { .. } => "aborted",
            Self::Io { .. } => "io",
        }
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
