// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-run scratch storage.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/src/packbench-support.js      shared helper module
//! <out>/src/<stem>.data.js            blob module
//! <out>/src/<stem>.src.js             generated entry
//! <out>/dist/<stem>.js                bundled artifact
//! <out>/dist/<stem>.json              dependency manifest
//! <out>/dist/<stem>.html              wrapper page
//! <out>/dist/<stem>.decompressed      mismatch dump
//! ```
//!
//! `<stem>` is `p<payload index>-s<strategy index>-<strategy>-<payload>`. The
//! index prefix alone identifies the pair; the names are there for humans.
//! Strategy names may contain `-`, so the names by themselves are ambiguous.

use std::path::{Component, Path, PathBuf};

use crate::error::{BenchError, BenchResult, ConfigurationError};
use crate::strategy::{support_module_source, SUPPORT_MODULE};
use crate::types::PairId;

/// Files belonging to one (payload, strategy) pair.
#[derive(Debug, Clone)]
pub struct PairFiles {
    pub stem: String,
    pub data_module: PathBuf,
    pub entry: PathBuf,
    pub artifact: PathBuf,
    pub manifest: PathBuf,
    pub wrapper: PathBuf,
    pub dump: PathBuf,
}

impl PairFiles {
    /// Import path of the data module relative to the entry.
    pub fn data_import(&self) -> String {
        format!("./{}.data.js", self.stem)
    }

    /// Artifact path for a second, independent build of the same entry.
    pub fn rebuild(&self) -> PathBuf {
        self.artifact.with_file_name(format!("{}.rebuild.js", self.stem))
    }
}

/// Clean-per-run scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    src: PathBuf,
    dist: PathBuf,
}

impl ScratchDir {
    /// Wipe and recreate the scratch directory, then write the support module.
    pub fn prepare(root: impl Into<PathBuf>) -> BenchResult<Self> {
        let root = root.into();

        let cwd = std::env::current_dir().map_err(|e| BenchError::Io {
            context: "resolving working directory",
            source: e,
        })?;
        if is_unsafe_root(&root, &cwd) {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "output_dir",
                value: root.display().to_string(),
                reason: "Refusing to wipe this directory; choose a dedicated output directory"
                    .to_string(),
            }
            .into());
        }

        let src = root.join("src");
        let dist = root.join("dist");

        for dir in [&src, &dist] {
            if dir.exists() {
                std::fs::remove_dir_all(dir).map_err(|e| BenchError::Io {
                    context: "cleaning scratch directory",
                    source: e,
                })?;
            }
            std::fs::create_dir_all(dir).map_err(|e| BenchError::Io {
                context: "creating scratch directory",
                source: e,
            })?;
        }

        std::fs::write(src.join(SUPPORT_MODULE), support_module_source()).map_err(|e| {
            BenchError::Io {
                context: "writing support module",
                source: e,
            }
        })?;

        tracing::debug!(scratch = %root.display(), "Scratch directory prepared");

        Ok(Self { root, src, dist })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> &Path {
        &self.src
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist
    }

    /// File set for a pair.
    pub fn pair_files(&self, id: PairId, strategy: &str, payload: &str) -> PairFiles {
        let stem = format!("p{}-s{}-{}-{}", id.payload, id.strategy, strategy, payload);
        PairFiles {
            data_module: self.src.join(format!("{}.data.js", stem)),
            entry: self.src.join(format!("{}.src.js", stem)),
            artifact: self.dist.join(format!("{}.js", stem)),
            manifest: self.dist.join(format!("{}.json", stem)),
            wrapper: self.dist.join(format!("{}.html", stem)),
            dump: self.dist.join(format!("{}.decompressed", stem)),
            stem,
        }
    }
}

/// A filesystem root, `cwd` or any of its ancestors, or anything spelled with `..`.
fn is_unsafe_root(root: &Path, cwd: &Path) -> bool {
    if root.as_os_str().is_empty() || root.parent().is_none() {
        return true;
    }

    if root.components().any(|c| c == Component::ParentDir) {
        return true;
    }

    // a not-yet-existing directory cannot be an ancestor of the cwd
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        cwd.join(root)
    };
    match (root.canonicalize(), cwd.canonicalize()) {
        (Ok(root), Ok(cwd)) => cwd.starts_with(root),
        _ => false,
    }
}
