// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Corpus loading.
//!
//! A corpus is a directory of payload files. Each regular file is one payload,
//! named by its file name. Enumeration is sorted by name so report order does
//! not depend on directory iteration order. Payloads are text: the sandbox
//! hands them back as strings, so a file that is not valid UTF-8 is rejected
//! before any pair runs. A leading byte order mark is content and is kept.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{BenchError, BenchResult};

/// An immutable document under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    name: String,
    content: Vec<u8>,
}

impl Payload {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Raw size in bytes.
    pub fn raw_size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Payloads in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    payloads: Vec<Arc<Payload>>,
}

impl Corpus {
    /// Build a corpus from already-loaded payloads, keeping their order.
    pub fn from_payloads(payloads: impl IntoIterator<Item = Payload>) -> Self {
        Self {
            payloads: payloads.into_iter().map(Arc::new).collect(),
        }
    }

    /// Load every regular, non-hidden file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> BenchResult<Self> {
        let dir = dir.as_ref();

        if !dir.is_dir() {
            return Err(BenchError::CorpusNotFound {
                path: dir.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| BenchError::Io {
            context: "listing corpus directory",
            source: e,
        })?;

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BenchError::Io {
                context: "listing corpus directory",
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            files.push((name, path));
        }

        if files.is_empty() {
            return Err(BenchError::EmptyCorpus {
                path: dir.to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut payloads = Vec::with_capacity(files.len());
        for (name, path) in files {
            let content = std::fs::read(&path).map_err(|e| BenchError::Io {
                context: "reading payload file",
                source: e,
            })?;
            if let Err(e) = std::str::from_utf8(&content) {
                return Err(BenchError::InvalidPayload {
                    name,
                    offset: e.valid_up_to(),
                });
            }
            tracing::debug!(payload = %name, bytes = content.len(), "Loaded payload");
            payloads.push(Payload::new(name, content));
        }

        tracing::info!(
            corpus = %dir.display(),
            payloads = payloads.len(),
            "Corpus loaded"
        );

        Ok(Self::from_payloads(payloads))
    }

    pub fn payloads(&self) -> &[Arc<Payload>] {
        &self.payloads
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}
