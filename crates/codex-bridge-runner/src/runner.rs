//! Codex CLI Runner implementation
//!
//! Spawns `codex` with a prepared argument vector, streams stdout through the
//! [`EventExtractor`] and turns the exit status into an [`ExecOutcome`].

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info};

use crate::extractor::EventExtractor;
use crate::launcher::{ProcessLauncher, TokioLauncher};
use crate::types::*;

/// Default executable name
pub const DEFAULT_CODEX_BIN: &str = "codex";

/// Stderr lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;

/// Codex CLI Runner
///
/// Cheap to clone; concurrent `run` calls each own their child process.
#[derive(Clone)]
pub struct CodexRunner {
    program: String,
    timeout: Option<Duration>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Default for CodexRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CODEX_BIN)
    }
}

impl CodexRunner {
    /// Runner for `program`, launching real processes
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_launcher(program, Arc::new(TokioLauncher))
    }

    /// Runner using a custom launcher
    pub fn with_launcher(program: impl Into<String>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            launcher,
        }
    }

    /// Kill the child and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run codex with `args`, in `cwd` (or the current directory)
    ///
    /// `label` identifies the invocation in logs and errors.
    pub async fn run(
        &self,
        args: Vec<String>,
        cwd: Option<&Path>,
        label: &str,
    ) -> Result<ExecOutcome, RunnerError> {
        match self.timeout {
            Some(after) => tokio::time::timeout(after, self.run_to_exit(&args, cwd, label))
                .await
                .map_err(|_| RunnerError::Timeout {
                    label: label.to_string(),
                    after,
                })?,
            None => self.run_to_exit(&args, cwd, label).await,
        }
    }

    async fn run_to_exit(
        &self,
        args: &[String],
        cwd: Option<&Path>,
        label: &str,
    ) -> Result<ExecOutcome, RunnerError> {
        debug!(%label, program = %self.program, ?args, ?cwd, "Starting codex");

        let process = self
            .launcher
            .launch(&self.program, args, cwd)
            .await
            .map_err(|source| RunnerError::Spawn {
                label: label.to_string(),
                source,
            })?;

        let stderr_handle = tokio::spawn(drain_stderr(process.stderr, label.to_string()));

        let mut extractor = EventExtractor::new();
        let mut stdout_reader = BufReader::new(process.stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = stdout_reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|source| RunnerError::Io {
                    label: label.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            extractor.push_line(strip_line_ending(&String::from_utf8_lossy(&buf)));
        }

        let code = process.exit.await.map_err(|source| RunnerError::Io {
            label: label.to_string(),
            source,
        })?;
        let stderr = stderr_handle.await.unwrap_or_default();

        if code != Some(0) {
            return Err(RunnerError::NonZeroExit {
                label: label.to_string(),
                code,
                stderr,
            });
        }

        let extracted = extractor.finish();
        let session_id = extracted
            .session_id
            .clone()
            .ok_or_else(|| RunnerError::MissingSessionId {
                label: label.to_string(),
            })?;

        info!(%label, %session_id, "Codex finished");

        Ok(ExecOutcome {
            session_id,
            display_text: extracted.display_text().to_string(),
            final_message: extracted.final_message,
            raw_output: extracted.raw_output,
            exit_code: 0,
        })
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Log stderr as it arrives; keep the last few lines
async fn drain_stderr(stderr: Box<dyn AsyncRead + Send + Unpin>, label: String) -> Vec<String> {
    let mut reader = BufReader::new(stderr);
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                debug!(%label, "codex stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
    }
    tail.into()
}
