// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark orchestration.
//!
//! Every (payload, strategy) pair runs as its own task:
//! compress → self-check → stage → build → execute → verify → record.
//! Failures are converted to a [`PairFailure`] at the pair boundary and never
//! reach sibling pairs. Only run-level problems (scratch storage, an empty
//! registry) surface as [`BenchError`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use crate::builder::{ArtifactBuilder, Bundler};
use crate::config::Config;
use crate::corpus::{Corpus, Payload};
use crate::error::{BenchResult, ConfigurationError, PairFailure, StrategyError};
use crate::metrics::{MeasurementRecord, MetricsCollector, PairOutcome, PairRecord, RunResults};
use crate::registry::StrategyRegistry;
use crate::sandbox::{SandboxEngine, SandboxRunner};
use crate::scratch::{PairFiles, ScratchDir};
use crate::strategy::Strategy;
use crate::types::PairId;
use crate::verifier;

/// Per-run switches that are not part of the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Build every successful pair twice and compare checksums.
    pub check_determinism: bool,
}

/// Drives a benchmark run over a corpus.
pub struct Orchestrator {
    registry: Arc<StrategyRegistry>,
    engine: Arc<dyn SandboxEngine>,
    builder: ArtifactBuilder,
    runner: SandboxRunner,
    options: RunOptions,
}

impl Orchestrator {
    /// Wire the collaborators together.
    ///
    /// The engine must already be launched. It is closed when [`run`] ends.
    ///
    /// [`run`]: Orchestrator::run
    pub fn new(
        registry: StrategyRegistry,
        bundler: Arc<dyn Bundler>,
        engine: Arc<dyn SandboxEngine>,
        config: &Config,
        options: RunOptions,
    ) -> BenchResult<Self> {
        if registry.is_empty() {
            return Err(ConfigurationError::NoStrategies.into());
        }

        Ok(Self {
            registry: Arc::new(registry),
            builder: ArtifactBuilder::new(bundler, config.bundler.concurrency),
            runner: SandboxRunner::new(
                Arc::clone(&engine),
                config.sandbox.concurrency,
                config.sandbox.timeout,
            ),
            engine,
            options,
        })
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Run every pair and return the ordered, scored results.
    ///
    /// The engine is closed before returning, whatever the outcome.
    pub async fn run(&self, corpus: &Corpus, output_dir: &Path) -> BenchResult<RunResults> {
        let result = self.run_pairs(corpus, output_dir).await;

        if let Err(e) = self.engine.close().await {
            tracing::warn!(error = %e, "Failed to close sandbox engine");
        }

        result
    }

    async fn run_pairs(&self, corpus: &Corpus, output_dir: &Path) -> BenchResult<RunResults> {
        let scratch = ScratchDir::prepare(output_dir)?;
        let collector = Arc::new(MetricsCollector::new());
        let started = Instant::now();

        tracing::info!(
            payloads = corpus.len(),
            strategies = self.registry.len(),
            scratch = %scratch.root().display(),
            "Starting benchmark run"
        );

        let mut tasks = JoinSet::new();
        let mut task_pairs = HashMap::new();

        for (p, payload) in corpus.payloads().iter().enumerate() {
            for (s, strategy) in self.registry.list().iter().enumerate() {
                let id = PairId::new(p, s);
                let job = PairJob {
                    payload: Arc::clone(payload),
                    strategy: Arc::clone(strategy),
                    files: scratch.pair_files(id, strategy.name().as_str(), payload.name()),
                    builder: self.builder.clone(),
                    runner: self.runner.clone(),
                    options: self.options,
                };
                let collector = Arc::clone(&collector);

                let handle = tasks.spawn(async move {
                    let outcome = job.run().await;
                    collector.record(id, outcome);
                });
                task_pairs.insert(handle.id(), id);
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = joined {
                if let Some(id) = task_pairs.get(&e.id()) {
                    tracing::error!(pair = %id, error = %e, "Pair task aborted");
                    collector.record(
                        *id,
                        PairOutcome::Failed(PairFailure::Aborted {
                            reason: e.to_string(),
                        }),
                    );
                }
            }
        }

        let results = collector.finish(corpus, &self.registry);

        tracing::info!(
            pairs = results.pair_count(),
            failures = results.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Benchmark run complete"
        );

        Ok(results)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("strategies", &self.registry.len())
            .field("builder", &self.builder)
            .field("runner", &self.runner)
            .field("options", &self.options)
            .finish()
    }
}

/// Everything one pair task owns.
struct PairJob {
    payload: Arc<Payload>,
    strategy: Arc<dyn Strategy>,
    files: PairFiles,
    builder: ArtifactBuilder,
    runner: SandboxRunner,
    options: RunOptions,
}

impl PairJob {
    async fn run(self) -> PairOutcome {
        let payload = self.payload.name().to_string();
        let strategy = self.strategy.name().to_string();

        match self.execute().await {
            Ok(record) => {
                let m = &record.measurement;
                tracing::info!(
                    payload = %payload,
                    strategy = %strategy,
                    compressed = m.compressed_size,
                    artifact = m.artifact_size,
                    decompress_us = m.decompress_time.as_micros() as u64,
                    "Pair complete"
                );
                PairOutcome::Success(record)
            }
            Err(failure) => {
                tracing::warn!(
                    payload = %payload,
                    strategy = %strategy,
                    kind = failure.kind(),
                    error = %failure,
                    "Pair failed"
                );
                PairOutcome::Failed(failure)
            }
        }
    }

    async fn execute(&self) -> Result<PairRecord, PairFailure> {
        let (blob, compress_time) = {
            let strategy = Arc::clone(&self.strategy);
            let payload = Arc::clone(&self.payload);
            tokio::task::spawn_blocking(move || -> Result<_, StrategyError> {
                let start = Instant::now();
                let blob = strategy.compress(payload.content())?;
                let elapsed = start.elapsed();

                // reference decode before spending a bundler slot
                if strategy.decompress(&blob)? != payload.content() {
                    return Err(StrategyError::Decode {
                        strategy: strategy.name().to_string(),
                        reason: "reference decoder does not reproduce the payload".to_string(),
                    });
                }
                Ok((blob, elapsed))
            })
            .await
            .map_err(|e| PairFailure::Aborted {
                reason: e.to_string(),
            })??
        };

        self.builder
            .stage(&self.files, self.strategy.as_ref(), &blob)
            .await?;
        let built = self.builder.build(&self.files).await?;

        let deterministic = if self.options.check_determinism {
            match self.builder.is_deterministic(&self.files, &built).await {
                Ok(same) => {
                    if !same {
                        tracing::warn!(artifact = %built.path.display(), "Non-deterministic build");
                    }
                    Some(same)
                }
                Err(e) => {
                    tracing::warn!(artifact = %built.path.display(), error = %e, "Rebuild failed");
                    Some(false)
                }
            }
        } else {
            None
        };

        let output = self.runner.run(&built.path).await?;
        verifier::verify(
            self.payload.content(),
            output.value.as_bytes(),
            &self.files.dump,
        )
        .await?;

        let measurement = MeasurementRecord::new(
            self.payload.raw_size(),
            blob.len() as u64,
            built.size,
            compress_time,
            output.duration,
            built.build_time,
        )?;

        Ok(PairRecord {
            measurement,
            artifact_path: built.path,
            manifest: built.manifest,
            deterministic,
        })
    }
}
