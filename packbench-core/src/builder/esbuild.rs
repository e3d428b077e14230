//! esbuild as an external process.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::{BuildOutput, Bundler, DependencyManifest, ManifestInput};
use crate::config::{BundleFormat, BundlerConfig};
use crate::error::BuildFailure;

/// Longest diagnostic excerpt carried in a build failure.
const DIAGNOSTIC_EXCERPT: usize = 4096;

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    inputs: BTreeMap<String, MetafileInput>,
}

#[derive(Debug, Deserialize)]
struct MetafileInput {
    bytes: u64,
}

/// Parse an esbuild metafile into a dependency manifest.
pub(crate) fn parse_metafile(json: &[u8]) -> Result<DependencyManifest, String> {
    let metafile: Metafile = serde_json::from_slice(json).map_err(|e| e.to_string())?;
    Ok(DependencyManifest {
        inputs: metafile
            .inputs
            .into_iter()
            .map(|(path, input)| ManifestInput {
                path,
                bytes: input.bytes,
            })
            .collect(),
    })
}

/// Runs the configured esbuild executable once per build.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    program: String,
    working_dir: PathBuf,
    target: String,
    format: BundleFormat,
    platform: String,
}

impl EsbuildBundler {
    pub fn new(config: &BundlerConfig) -> Self {
        Self {
            program: config.program.clone(),
            working_dir: config.working_dir.clone(),
            target: config.target.clone(),
            format: config.format,
            platform: config.platform.clone(),
        }
    }

    fn args(&self, entry: &Path, outfile: &Path, metafile: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            entry.into(),
            "--bundle".into(),
            "--minify".into(),
            format!("--format={}", self.format.as_str()).into(),
            format!("--platform={}", self.platform).into(),
            format!("--target={}", self.target).into(),
            "--legal-comments=none".into(),
            "--log-level=warning".into(),
        ];

        let mut flag = OsString::from("--metafile=");
        flag.push(metafile);
        args.push(flag);

        let mut flag = OsString::from("--outfile=");
        flag.push(outfile);
        args.push(flag);

        args
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    async fn build(&self, entry: &Path, outfile: &Path) -> Result<BuildOutput, BuildFailure> {
        let entry = absolute(entry)?;
        let outfile = absolute(outfile)?;
        let metafile = outfile.with_extension("json");

        let output = Command::new(&self.program)
            .args(self.args(&entry, &outfile, &metafile))
            .current_dir(&self.working_dir)
            .env("NODE_PATH", self.working_dir.join("node_modules"))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BuildFailure::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildFailure::Toolchain {
                status: output.status.to_string(),
                diagnostic: stderr.trim().chars().take(DIAGNOSTIC_EXCERPT).collect(),
            });
        }

        if !outfile.is_file() {
            return Err(BuildFailure::MissingArtifact { path: outfile });
        }

        let raw = tokio::fs::read(&metafile)
            .await
            .map_err(|e| BuildFailure::Manifest {
                path: metafile.clone(),
                reason: e.to_string(),
            })?;
        let manifest = parse_metafile(&raw).map_err(|reason| BuildFailure::Manifest {
            path: metafile.clone(),
            reason,
        })?;

        tracing::debug!(
            entry = %entry.display(),
            inputs = manifest.inputs.len(),
            "esbuild finished"
        );

        Ok(BuildOutput {
            artifact_path: outfile,
            manifest,
        })
    }
}

/// Resolve against the current directory; esbuild runs in `working_dir`.
fn absolute(path: &Path) -> Result<PathBuf, BuildFailure> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| BuildFailure::Io {
        context: "resolving current directory",
        source,
    })?;
    Ok(cwd.join(path))
}
