// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sandboxed execution of built artifacts.
//!
//! The engine is a shared handle opened once per run. Each execution gets its
//! own context: one inbound message (load the artifact) and one outbound
//! message (the published result, or a timeout). The runner guarantees the
//! context is closed on every path.

mod node;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::SandboxError;

pub use node::NodeEngine;

/// Global the generated entry publishes `{ duration, value }` to.
pub const RESULT_SLOT: &str = "decompressed";

/// Backstop past the context's own timeout, for contexts that ignore it.
const RUNNER_SLACK: Duration = Duration::from_millis(250);

/// Value read back from the result slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxOutput {
    /// Decompression time measured inside the sandbox.
    pub duration: Duration,
    /// Decompressed text.
    pub value: String,
}

/// Wire shape of the result slot.
#[derive(Debug, Deserialize)]
pub(crate) struct SlotValue {
    pub duration: f64,
    pub value: String,
}

impl SlotValue {
    /// Convert a published slot into an output, rejecting nonsense durations.
    pub(crate) fn into_output(self) -> Result<SandboxOutput, SandboxError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(SandboxError::Protocol {
                reason: format!("published duration {} is not a valid time", self.duration),
            });
        }
        Ok(SandboxOutput {
            // milliseconds with sub-millisecond precision
            duration: Duration::from_nanos((self.duration * 1_000_000.0).round() as u64),
            value: self.value,
        })
    }
}

/// Shared sandbox engine.
#[async_trait]
pub trait SandboxEngine: Send + Sync {
    /// Acquire a fresh isolated context.
    async fn new_context(&self) -> Result<Box<dyn SandboxContext>, SandboxError>;

    /// Shut the engine down. Contexts requested afterwards fail with
    /// `EngineClosed`.
    async fn close(&self) -> Result<(), SandboxError>;
}

/// One isolated execution context.
#[async_trait]
pub trait SandboxContext: Send {
    /// Load and start executing an artifact.
    async fn load(&mut self, artifact: &Path) -> Result<(), SandboxError>;

    /// Wait until the artifact publishes to the result slot.
    async fn wait_for_result(&mut self, timeout: Duration) -> Result<SandboxOutput, SandboxError>;

    /// Release the context and everything it holds.
    async fn close(self: Box<Self>);
}

/// Runs artifacts against a shared engine with a concurrency bound and a hard
/// per-execution timeout.
#[derive(Clone)]
pub struct SandboxRunner {
    engine: Arc<dyn SandboxEngine>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl SandboxRunner {
    pub fn new(engine: Arc<dyn SandboxEngine>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one artifact and return its published result.
    pub async fn run(&self, artifact: &Path) -> Result<SandboxOutput, SandboxError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SandboxError::EngineClosed)?;

        let mut context = self.engine.new_context().await?;

        let result = match context.load(artifact).await {
            Ok(()) => {
                let deadline = self.timeout + RUNNER_SLACK;
                match tokio::time::timeout(deadline, context.wait_for_result(self.timeout)).await {
                    Ok(result) => result,
                    Err(_) => Err(SandboxError::Timeout {
                        timeout: self.timeout,
                    }),
                }
            }
            Err(e) => Err(e),
        };

        context.close().await;

        if let Err(ref e) = result {
            tracing::debug!(artifact = %artifact.display(), error = %e, "Sandbox execution failed");
        }

        result
    }
}

impl std::fmt::Debug for SandboxRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxRunner")
            .field("available", &self.permits.available_permits())
            .field("timeout", &self.timeout)
            .finish()
    }
}
