// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! In-process stand-ins for the bundler and the sandbox engine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use packbench_core::builder::{BuildOutput, Bundler, DependencyManifest, ManifestInput};
use packbench_core::error::{BuildFailure, SandboxError};
use packbench_core::sandbox::{SandboxContext, SandboxEngine, SandboxOutput};
use packbench_core::strategy::Strategy;

/// Concatenates the entry and its data module into the outfile.
#[derive(Default)]
pub struct FakeBundler {
    /// Strategy names whose builds fail.
    pub failing: Vec<String>,
    /// Pad every artifact with spaces up to this many bytes.
    pub pad_to: Option<usize>,
    pub builds: AtomicUsize,
}

impl FakeBundler {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn build(&self, entry: &Path, outfile: &Path) -> Result<BuildOutput, BuildFailure> {
        self.builds.fetch_add(1, Ordering::SeqCst);

        let file_name = entry.file_name().unwrap().to_string_lossy().to_string();
        let (_, _, names) = split_stem(&file_name).unwrap();
        if self.failing.iter().any(|n| names.starts_with(&format!("{}-", n))) {
            return Err(BuildFailure::Toolchain {
                status: "exit status: 1".to_string(),
                diagnostic: format!("Could not resolve decoder for {}", file_name),
            });
        }

        let data_module = PathBuf::from(entry.to_string_lossy().replace(".src.js", ".data.js"));
        let entry_source = std::fs::read_to_string(entry).unwrap();
        let data_source = std::fs::read_to_string(&data_module).unwrap();

        let mut artifact = format!("{}\n{}", data_source, entry_source);
        if let Some(pad_to) = self.pad_to {
            while artifact.len() < pad_to {
                artifact.push(' ');
            }
        }
        std::fs::write(outfile, &artifact).unwrap();

        Ok(BuildOutput {
            artifact_path: outfile.to_path_buf(),
            manifest: DependencyManifest {
                inputs: vec![
                    ManifestInput {
                        path: entry.display().to_string(),
                        bytes: entry_source.len() as u64,
                    },
                    ManifestInput {
                        path: data_module.display().to_string(),
                        bytes: data_source.len() as u64,
                    },
                ],
            },
        })
    }
}

/// How the fake sandbox treats a strategy's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Decode with the strategy's reference decoder.
    Decode,
    /// Never publish.
    Hang,
    /// Exit abnormally.
    Crash,
    /// Publish a value with the last byte changed.
    Corrupt,
}

#[derive(Default)]
pub struct EngineStats {
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub engine_closes: AtomicUsize,
}

/// Decodes artifacts in-process using the strategies' reference decoders.
///
/// Strategies must be given in registration order; artifacts are matched to
/// them by the strategy index in the scratch file name.
pub struct FakeEngine {
    strategies: Vec<Arc<dyn Strategy>>,
    behaviors: HashMap<String, Behavior>,
    durations: HashMap<String, Duration>,
    pub stats: Arc<EngineStats>,
}

impl FakeEngine {
    pub fn new(strategies: &[Arc<dyn Strategy>]) -> Self {
        Self {
            strategies: strategies.to_vec(),
            behaviors: HashMap::new(),
            durations: HashMap::new(),
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn with_behavior(mut self, strategy: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(strategy.to_string(), behavior);
        self
    }

    pub fn with_duration(mut self, strategy: &str, duration: Duration) -> Self {
        self.durations.insert(strategy.to_string(), duration);
        self
    }
}

#[async_trait]
impl SandboxEngine for FakeEngine {
    async fn new_context(&self) -> Result<Box<dyn SandboxContext>, SandboxError> {
        if self.stats.engine_closes.load(Ordering::SeqCst) > 0 {
            return Err(SandboxError::EngineClosed);
        }
        self.stats.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            strategies: self.strategies.clone(),
            behaviors: self.behaviors.clone(),
            durations: self.durations.clone(),
            stats: Arc::clone(&self.stats),
            loaded: None,
        }))
    }

    async fn close(&self) -> Result<(), SandboxError> {
        self.stats.engine_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeContext {
    strategies: Vec<Arc<dyn Strategy>>,
    behaviors: HashMap<String, Behavior>,
    durations: HashMap<String, Duration>,
    stats: Arc<EngineStats>,
    loaded: Option<(Arc<dyn Strategy>, String)>,
}

#[async_trait]
impl SandboxContext for FakeContext {
    async fn load(&mut self, artifact: &Path) -> Result<(), SandboxError> {
        let file_name = artifact.file_name().unwrap().to_string_lossy().to_string();
        let strategy = split_stem(&file_name)
            .and_then(|(_, s, _)| self.strategies.get(s))
            .cloned()
            .ok_or_else(|| SandboxError::Crash {
                reason: format!("no strategy for {}", file_name),
            })?;

        let source = std::fs::read_to_string(artifact).map_err(|e| SandboxError::Crash {
            reason: e.to_string(),
        })?;
        self.loaded = Some((strategy, source));
        Ok(())
    }

    async fn wait_for_result(&mut self, timeout: Duration) -> Result<SandboxOutput, SandboxError> {
        let (strategy, source) = self.loaded.take().ok_or_else(|| SandboxError::Protocol {
            reason: "nothing loaded".to_string(),
        })?;
        let name = strategy.name().to_string();

        match self.behaviors.get(&name).copied().unwrap_or(Behavior::Decode) {
            Behavior::Hang => {
                tokio::time::sleep(timeout).await;
                Err(SandboxError::Timeout { timeout })
            }
            Behavior::Crash => Err(SandboxError::Crash {
                reason: "ReferenceError: inflate is not defined".to_string(),
            }),
            behavior => {
                let blob = extract_blob(&source).ok_or_else(|| SandboxError::Protocol {
                    reason: "artifact carries no blob".to_string(),
                })?;
                let mut value = strategy.decompress(&blob).map_err(|e| SandboxError::Crash {
                    reason: e.to_string(),
                })?;
                if behavior == Behavior::Corrupt {
                    if let Some(last) = value.last_mut() {
                        *last = if *last == b'x' { b'y' } else { b'x' };
                    }
                }
                Ok(SandboxOutput {
                    duration: self
                        .durations
                        .get(&name)
                        .copied()
                        .unwrap_or(Duration::from_millis(1)),
                    value: String::from_utf8(value).map_err(|e| SandboxError::Protocol {
                        reason: e.to_string(),
                    })?,
                })
            }
        }
    }

    async fn close(self: Box<Self>) {
        self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Split a `p<payload>-s<strategy>-<names>` scratch file name.
pub fn split_stem(file_name: &str) -> Option<(usize, usize, &str)> {
    let rest = file_name.strip_prefix('p')?;
    let (payload, rest) = rest.split_once("-s")?;
    let (strategy, names) = rest.split_once('-')?;
    Some((payload.parse().ok()?, strategy.parse().ok()?, names))
}

/// Pull the string literal out of `module.exports = "...";`.
fn extract_blob(source: &str) -> Option<String> {
    let line = source
        .lines()
        .find(|l| l.starts_with("module.exports = "))?;
    let literal = line
        .trim_start_matches("module.exports = ")
        .trim_end()
        .trim_end_matches(';');
    serde_json::from_str(literal).ok()
}
