// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Artifact building.
//!
//! The builder stages a pair's inputs in scratch storage (data module, entry
//! module, wrapper page), hands the entry to a [`Bundler`], and measures the
//! resulting artifact. Bundler invocations share a separate concurrency bound
//! from sandbox executions; the default serializes them.

mod esbuild;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::BuildFailure;
use crate::scratch::PairFiles;
use crate::strategy::Strategy;

pub use esbuild::EsbuildBundler;

/// One input the bundler pulled into an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInput {
    pub path: String,
    pub bytes: u64,
}

/// Inputs of a built artifact, as reported by the bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    pub inputs: Vec<ManifestInput>,
}

impl DependencyManifest {
    /// Sum of all input sizes before minification.
    pub fn total_input_bytes(&self) -> u64 {
        self.inputs.iter().map(|i| i.bytes).sum()
    }
}

/// What a bundler hands back for one entry.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub artifact_path: PathBuf,
    pub manifest: DependencyManifest,
}

/// External packaging step: dependency resolution, minification and
/// packaging of one entry module into one runnable file.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle `entry` into `outfile`. The dependency manifest is written next
    /// to the artifact with a `.json` extension.
    async fn build(&self, entry: &Path, outfile: &Path) -> Result<BuildOutput, BuildFailure>;
}

/// A measured artifact.
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub checksum: u32,
    pub manifest: DependencyManifest,
    pub build_time: Duration,
}

/// Stages inputs and drives the bundler under a concurrency bound.
#[derive(Clone)]
pub struct ArtifactBuilder {
    bundler: Arc<dyn Bundler>,
    permits: Arc<Semaphore>,
}

impl ArtifactBuilder {
    pub fn new(bundler: Arc<dyn Bundler>, concurrency: usize) -> Self {
        Self {
            bundler,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Write the data module, the entry module and the wrapper page.
    pub async fn stage(
        &self,
        files: &PairFiles,
        strategy: &dyn Strategy,
        blob: &str,
    ) -> Result<(), BuildFailure> {
        write(&files.data_module, data_module_source(blob), "writing data module").await?;
        write(
            &files.entry,
            strategy.generate_source(&files.data_import()),
            "writing entry module",
        )
        .await?;
        write(&files.wrapper, wrapper_page(&files.stem), "writing wrapper page").await?;
        Ok(())
    }

    /// Bundle a staged pair and measure the artifact.
    pub async fn build(&self, files: &PairFiles) -> Result<BuiltArtifact, BuildFailure> {
        self.build_to(&files.entry, &files.artifact).await
    }

    /// Build the pair a second time and compare checksums.
    /// Returns true when both builds are byte-identical.
    pub async fn is_deterministic(
        &self,
        files: &PairFiles,
        first: &BuiltArtifact,
    ) -> Result<bool, BuildFailure> {
        let second = self.build_to(&files.entry, &files.rebuild()).await?;
        Ok(second.checksum == first.checksum && second.size == first.size)
    }

    async fn build_to(&self, entry: &Path, outfile: &Path) -> Result<BuiltArtifact, BuildFailure> {
        let _permit = self.permits.acquire().await.map_err(|_| BuildFailure::Io {
            context: "acquiring bundler slot",
            source: std::io::Error::other("bundler pool closed"),
        })?;

        let start = Instant::now();
        let output = self.bundler.build(entry, outfile).await?;
        let build_time = start.elapsed();

        let bytes = match tokio::fs::read(&output.artifact_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BuildFailure::MissingArtifact {
                    path: output.artifact_path,
                })
            }
            Err(e) => {
                return Err(BuildFailure::Io {
                    context: "reading artifact",
                    source: e,
                })
            }
        };

        tracing::debug!(
            artifact = %output.artifact_path.display(),
            bytes = bytes.len(),
            elapsed_ms = build_time.as_millis() as u64,
            "Artifact built"
        );

        Ok(BuiltArtifact {
            size: bytes.len() as u64,
            checksum: crc32fast::hash(&bytes),
            path: output.artifact_path,
            manifest: output.manifest,
            build_time,
        })
    }
}

impl std::fmt::Debug for ArtifactBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBuilder")
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

async fn write(path: &Path, contents: String, context: &'static str) -> Result<(), BuildFailure> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| BuildFailure::Io { context, source })
}

/// CommonJS module whose default export is the blob.
pub fn data_module_source(blob: &str) -> String {
    let literal = serde_json::to_string(blob).unwrap_or_else(|_| "\"\"".to_string());
    format!("module.exports = {};\n", literal)
}

/// Minimal page that loads the artifact, for inspecting a pair in a browser.
pub fn wrapper_page(stem: &str) -> String {
    let stem = escape_html(stem);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{stem}</title>
</head>
<body>
<script src="{stem}.js"></script>
</body>
</html>
"#
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
