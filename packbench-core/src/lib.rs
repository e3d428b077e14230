//! packbench core library
//!
//! Orchestration core for comparing JavaScript decompression strategies.
//! Provides the strategy plugin interface and built-in strategies, artifact
//! building through an external bundler, sandboxed execution, round-trip
//! verification, measurement collection and relative scoring.

pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod sandbox;
pub mod scoring;
pub mod scratch;
pub mod strategy;
pub mod types;
pub mod verifier;

// Re-export commonly used types
pub use builder::{ArtifactBuilder, BuildOutput, Bundler, DependencyManifest, EsbuildBundler};
pub use config::{Config, ConfigLoader, StrategyConfig};
pub use corpus::{Corpus, Payload};
pub use error::{
    BenchError, BenchResult, BuildFailure, ConfigurationError, PairFailure, SandboxError,
    StrategyError, VerificationMismatch,
};
pub use metrics::{MeasurementRecord, MetricsCollector, PairOutcome, PairRecord, RunResults};
pub use pipeline::{Orchestrator, RunOptions};
pub use registry::StrategyRegistry;
pub use sandbox::{NodeEngine, SandboxContext, SandboxEngine, SandboxOutput, SandboxRunner};
pub use scoring::{Mark, Metric, StrategyScore};
pub use strategy::{Strategy, StrategyKind};
pub use types::{CompressionLevel, PairId, StrategyName};
