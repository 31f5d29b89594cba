//! Process launching
//!
//! `CodexRunner` never touches `tokio::process` directly; it goes through a
//! [`ProcessLauncher`] so tests can script the child's output and exit code.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::debug;

/// Resolves to the child's exit code once it has exited (`None` if killed by a signal)
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send>>;

/// A started child process, split into its output pipes and its exit
pub struct SpawnedProcess {
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
    pub exit: ExitFuture,
}

/// Starts external commands
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` with `args`, in `cwd` if given
    async fn launch(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> io::Result<SpawnedProcess>;
}

/// Launches real processes with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioLauncher;

#[async_trait::async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> io::Result<SpawnedProcess> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(%program, ?args, ?cwd, "Spawning process");
        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Failed to capture stderr"))?;

        Ok(SpawnedProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit: Box::pin(async move { child.wait().await.map(|status| status.code()) }),
        })
    }
}

/// One recorded call to [`ScriptedLauncher::launch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
}

/// Fake launcher replaying a fixed script instead of running anything
///
/// Every launch emits the same stdout/stderr lines, then exits with
/// `exit_code` after `delay`. Launches are counted and recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    stdout: Vec<String>,
    stderr: Vec<String>,
    exit_code: Option<i32>,
    delay: Duration,
    spawn_error: Option<io::ErrorKind>,
    launches: Arc<AtomicUsize>,
    records: Arc<Mutex<Vec<LaunchRecord>>>,
}

impl ScriptedLauncher {
    /// Script that prints `stdout` and exits with status 0
    pub fn new<I, S>(stdout: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stdout: stdout.into_iter().map(Into::into).collect(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    /// Script whose launch itself fails with `kind`
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            spawn_error: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_stderr<I, S>(mut self, stderr: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stderr = stderr.into_iter().map(Into::into).collect();
        self
    }

    /// `None` simulates termination by a signal
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of launch attempts so far
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Arguments of every launch attempt so far
    pub fn records(&self) -> Vec<LaunchRecord> {
        self.records.lock().unwrap().clone()
    }
}

fn joined_lines(lines: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
    }
    buf
}

#[async_trait::async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> io::Result<SpawnedProcess> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(LaunchRecord {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.map(|p| p.display().to_string()),
        });

        if let Some(kind) = self.spawn_error {
            return Err(io::Error::new(kind, format!("cannot run {}", program)));
        }

        let exit_code = self.exit_code;
        let delay = self.delay;
        Ok(SpawnedProcess {
            stdout: Box::new(io::Cursor::new(joined_lines(&self.stdout))),
            stderr: Box::new(io::Cursor::new(joined_lines(&self.stderr))),
            exit: Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(exit_code)
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_tokio_launcher_missing_program() {
        let result = TokioLauncher
            .launch("codex-bridge-definitely-not-installed", &[], None)
            .await;
        let err = result.err().expect("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_launcher_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = TokioLauncher
            .launch("pwd", &[], Some(dir.path()))
            .await
            .unwrap();

        let mut out = String::new();
        process.stdout.read_to_string(&mut out).await.unwrap();
        let code = process.exit.await.unwrap();

        assert_eq!(code, Some(0));
        let reported = std::fs::canonicalize(out.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_scripted_launcher_replays_script() {
        let launcher = ScriptedLauncher::new(["one", "two"])
            .with_stderr(["warn"])
            .with_exit_code(Some(3));

        let mut process = launcher
            .launch("codex", &["exec".to_string()], Some(Path::new("/work")))
            .await
            .unwrap();

        let mut out = String::new();
        process.stdout.read_to_string(&mut out).await.unwrap();
        let mut err = String::new();
        process.stderr.read_to_string(&mut err).await.unwrap();

        assert_eq!(out, "one\ntwo\n");
        assert_eq!(err, "warn\n");
        assert_eq!(process.exit.await.unwrap(), Some(3));
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(
            launcher.records(),
            vec![LaunchRecord {
                program: "codex".to_string(),
                args: vec!["exec".to_string()],
                cwd: Some("/work".to_string()),
            }]
        );
    }
}
