//! Command runner: runs the pipeline as a child process.
//!
//! Protocol: the [`DispatchRequest`] is written to the child's stdin as one
//! JSON document and stdin is closed. The child prints a [`PipelineResult`]
//! JSON document on stdout and exits 0. Any other exit status is a failure
//! whose description is the child's stderr.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::DispatchError;
use crate::pipeline::types::{DispatchRequest, PipelineResult, PipelineRunner};

/// Maximum stderr kept in a failure description.
const MAX_STDERR_CHARS: usize = 2000;

/// Runs the analysis pipeline as an external command.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Build from a whitespace-separated command line such as
    /// `python -m pipeline.cli`. Returns None for a blank line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    fn failed(&self, reason: impl Into<String>) -> DispatchError {
        DispatchError::Failed {
            runner: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PipelineRunner for CommandRunner {
    fn name(&self) -> &str {
        "command"
    }

    async fn run(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError> {
        let payload = serde_json::to_vec(request)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| self.failed(format!("Failed to spawn {}: {}", self.program, e)))?;

        tracing::debug!(program = %self.program, pid = ?child.id(), "Pipeline process started");

        // Feed stdin while collecting output. A child that exits without
        // reading its input closes the pipe; its status and stderr still
        // describe the failure.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        match fed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::debug!(program = %self.program, "Pipeline closed stdin before reading the request");
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to write request to pipeline");
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(if stderr.is_empty() {
                self.failed(format!("exited with status {code}"))
            } else {
                self.failed(format!("exited with status {code}: {stderr}"))
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim()).map_err(|e| DispatchError::InvalidResponse {
            runner: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}
