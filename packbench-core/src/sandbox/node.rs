//! Node.js sandbox engine.
//!
//! Every context is its own `node` process running a small driver that
//! evaluates the artifact inside a `vm` context whose `window` is the context
//! global, polls the result slot, and prints it to stdout as JSON. A context
//! that never publishes is terminated with SIGTERM, then killed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use super::{SandboxContext, SandboxEngine, SandboxOutput, SlotValue, RESULT_SLOT};
use crate::error::SandboxError;

/// File name of the driver script written at launch.
const DRIVER_FILE: &str = "packbench-driver.cjs";

/// How long a terminated context gets to exit before it is killed.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Longest stderr excerpt carried in a crash reason.
const STDERR_EXCERPT: usize = 2048;

const DRIVER_SOURCE: &str = r#"'use strict';
const fs = require('fs');
const vm = require('vm');
const { performance } = require('perf_hooks');
const { TextDecoder } = require('util');

const [artifact, slot] = process.argv.slice(2);

const sandbox = {
    atob,
    btoa,
    TextDecoder,
    performance,
    console,
    setTimeout,
    clearTimeout,
};
sandbox.window = sandbox;
sandbox.self = sandbox;
vm.createContext(sandbox);

process.on('uncaughtException', (err) => {
    process.stderr.write(String((err && err.stack) || err));
    process.exit(3);
});

try {
    vm.runInContext(fs.readFileSync(artifact, 'utf8'), sandbox, { filename: artifact });
} catch (err) {
    process.stderr.write(String((err && err.stack) || err));
    process.exit(2);
}

function poll() {
    const result = sandbox[slot];
    if (result !== undefined) {
        const line = JSON.stringify({ duration: result.duration, value: result.value });
        process.stdout.write(line, () => process.exit(0));
        return;
    }
    setTimeout(poll, 5);
}
poll();
"#;

/// Engine handle backed by a `node` executable.
#[derive(Debug)]
pub struct NodeEngine {
    program: String,
    driver: PathBuf,
    closed: AtomicBool,
}

impl NodeEngine {
    /// Check the runtime is usable and install the driver under `work_dir`.
    pub async fn launch(
        program: impl Into<String>,
        work_dir: impl AsRef<Path>,
    ) -> Result<Self, SandboxError> {
        let program = program.into();
        let work_dir = work_dir.as_ref();

        let output = Command::new(&program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SandboxError::LaunchFailed {
                reason: format!("Failed to run '{}': {}", program, e),
            })?;

        if !output.status.success() {
            return Err(SandboxError::LaunchFailed {
                reason: format!("'{} --version' exited with {}", program, output.status),
            });
        }

        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| SandboxError::LaunchFailed {
                reason: format!("Failed to create {}: {}", work_dir.display(), e),
            })?;

        let driver = work_dir.join(DRIVER_FILE);
        tokio::fs::write(&driver, DRIVER_SOURCE)
            .await
            .map_err(|e| SandboxError::LaunchFailed {
                reason: format!("Failed to write driver {}: {}", driver.display(), e),
            })?;

        tracing::info!(
            program = %program,
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "Sandbox engine launched"
        );

        Ok(Self {
            program,
            driver,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl SandboxEngine for NodeEngine {
    async fn new_context(&self) -> Result<Box<dyn SandboxContext>, SandboxError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SandboxError::EngineClosed);
        }
        Ok(Box::new(NodeContext {
            program: self.program.clone(),
            driver: self.driver.clone(),
            child: None,
        }))
    }

    async fn close(&self) -> Result<(), SandboxError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(program = %self.program, "Sandbox engine closed");
        }
        Ok(())
    }
}

/// A single `node` process.
struct NodeContext {
    program: String,
    driver: PathBuf,
    child: Option<Child>,
}

#[async_trait]
impl SandboxContext for NodeContext {
    async fn load(&mut self, artifact: &Path) -> Result<(), SandboxError> {
        if self.child.is_some() {
            return Err(SandboxError::Protocol {
                reason: "context already holds an artifact".to_string(),
            });
        }

        let child = Command::new(&self.program)
            .arg(&self.driver)
            .arg(artifact)
            .arg(RESULT_SLOT)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Crash {
                reason: format!("Failed to spawn '{}': {}", self.program, e),
            })?;

        tracing::debug!(
            pid = child.id().unwrap_or_default(),
            artifact = %artifact.display(),
            "Sandbox context started"
        );

        self.child = Some(child);
        Ok(())
    }

    async fn wait_for_result(&mut self, timeout: Duration) -> Result<SandboxOutput, SandboxError> {
        let child = self.child.as_mut().ok_or_else(|| SandboxError::Protocol {
            reason: "no artifact loaded".to_string(),
        })?;

        let mut stdout = child.stdout.take().ok_or_else(|| SandboxError::Protocol {
            reason: "result already consumed".to_string(),
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| SandboxError::Protocol {
            reason: "result already consumed".to_string(),
        })?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(SandboxError::Crash {
                    reason: format!("Failed to wait for sandbox process: {}", e),
                })
            }
            Err(_) => {
                terminate(child).await;
                return Err(SandboxError::Timeout { timeout });
            }
        };

        let stdout = collect(stdout_task).await?;
        let stderr = collect(stderr_task).await?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(SandboxError::Crash {
                reason: format!("{} exited with {}: {}", self.program, status, excerpt),
            });
        }

        if stdout.is_empty() {
            return Err(SandboxError::Protocol {
                reason: "process exited without publishing a result".to_string(),
            });
        }

        let slot: SlotValue =
            serde_json::from_slice(&stdout).map_err(|e| SandboxError::Protocol {
                reason: format!("malformed result slot: {}", e),
            })?;
        slot.into_output()
    }

    async fn close(self: Box<Self>) {
        let NodeContext { child, .. } = *self;
        if let Some(mut child) = child {
            terminate(&mut child).await;
        }
    }
}

async fn collect(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, SandboxError> {
    match task.await {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(SandboxError::Protocol {
            reason: format!("failed to read sandbox output: {}", e),
        }),
        Err(e) => Err(SandboxError::Protocol {
            reason: format!("output reader panicked: {}", e),
        }),
    }
}

/// SIGTERM, a short grace period, then SIGKILL.
async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        // already reaped
        return;
    };

    if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
        && tokio::time::timeout(TERM_GRACE, child.wait()).await.is_ok()
    {
        tracing::debug!(pid = pid, "Sandbox context terminated");
        return;
    }

    if let Err(e) = child.kill().await {
        tracing::warn!(pid = pid, error = %e, "Failed to kill sandbox context");
    }
}
