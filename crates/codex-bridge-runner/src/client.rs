//! Start / resume / review pipelines
//!
//! Validates a request, builds its argument vector, runs codex and, for new
//! sessions, records the session in the registry.

use std::path::PathBuf;

use tracing::info;

use crate::commands::{CommandError, ResumeRequest, ReviewRequest, StartRequest};
use crate::runner::CodexRunner;
use crate::sessions::{SessionRecord, SessionRegistry};
use crate::types::{ExecOutcome, RunnerError};

/// Errors from a tool pipeline
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] CommandError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Codex operations exposed as tools
#[derive(Clone)]
pub struct CodexClient {
    runner: CodexRunner,
    sessions: SessionRegistry,
    default_cwd: Option<PathBuf>,
}

impl CodexClient {
    pub fn new(runner: CodexRunner) -> Self {
        Self::with_sessions(runner, SessionRegistry::new())
    }

    pub fn with_sessions(runner: CodexRunner, sessions: SessionRegistry) -> Self {
        Self {
            runner,
            sessions,
            default_cwd: None,
        }
    }

    /// Working directory for start/review calls that do not name one
    pub fn with_default_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.default_cwd = cwd;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Start a new read-only session
    pub async fn start(&self, request: StartRequest) -> Result<ExecOutcome, ClientError> {
        let args = request.to_args()?;
        let cwd = request.working_dir().or_else(|| self.default_cwd.clone());

        let outcome = self.runner.run(args, cwd.as_deref(), "codex exec").await?;

        let prompt = request.prompt.unwrap_or_default();
        self.sessions
            .insert(SessionRecord::new(outcome.session_id.clone(), prompt));
        info!(session_id = %outcome.session_id, sessions = self.sessions.len(), "Session started");
        Ok(outcome)
    }

    /// Continue a session; the id is taken as given
    pub async fn resume(&self, request: ResumeRequest) -> Result<ExecOutcome, ClientError> {
        let args = request.to_args()?;
        Ok(self.runner.run(args, None, "codex resume").await?)
    }

    /// Run a code review
    pub async fn review(&self, request: ReviewRequest) -> Result<ExecOutcome, ClientError> {
        let args = request.to_args()?;
        let cwd = request.working_dir().or_else(|| self.default_cwd.clone());
        Ok(self.runner.run(args, cwd.as_deref(), "codex review").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::ScriptedLauncher;
    use std::sync::Arc;

    fn started(id: &str) -> String {
        format!(r#"{{"type":"thread.started","thread_id":"{}"}}"#, id)
    }

    fn client(launcher: &ScriptedLauncher) -> CodexClient {
        CodexClient::new(CodexRunner::with_launcher("codex", Arc::new(launcher.clone())))
    }

    #[tokio::test]
    async fn test_start_registers_session() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new([started(&id)]);
        let client = client(&launcher);

        let outcome = client
            .start(StartRequest {
                prompt: Some("hello".to_string()),
                cwd: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.session_id, id);
        let record = client.sessions().get(&id).unwrap();
        assert_eq!(record.prompt, "hello");
    }

    #[tokio::test]
    async fn test_start_failure_does_not_register() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new([started(&id)]).with_exit_code(Some(2));
        let client = client(&launcher);

        let err = client
            .start(StartRequest {
                prompt: Some("hello".to_string()),
                cwd: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Runner(RunnerError::NonZeroExit { .. })));
        assert!(client.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_start_uses_cwd() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new([started(&id)]);
        let client = client(&launcher).with_default_cwd(Some(PathBuf::from("/default")));

        client
            .start(StartRequest {
                prompt: Some("p".to_string()),
                cwd: Some("/explicit".to_string()),
            })
            .await
            .unwrap();
        client
            .start(StartRequest {
                prompt: Some("p".to_string()),
                cwd: None,
            })
            .await
            .unwrap();

        let records = launcher.records();
        assert_eq!(records[0].cwd.as_deref(), Some("/explicit"));
        assert!(records[0].args.contains(&"/explicit".to_string()));
        assert_eq!(records[1].cwd.as_deref(), Some("/default"));
        assert!(!records[1].args.contains(&"-C".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_requests_never_spawn() {
        let launcher = ScriptedLauncher::new([started("unused")]);
        let client = client(&launcher);

        for request in [
            ResumeRequest::default(),
            ResumeRequest {
                session_id: Some("abc".to_string()),
                prompt: None,
            },
            ResumeRequest {
                session_id: None,
                prompt: Some("next".to_string()),
            },
        ] {
            let err = client.resume(request).await.unwrap_err();
            assert!(matches!(err, ClientError::Invalid(CommandError::MissingParameter(_))));
        }

        let err = client.start(StartRequest::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));

        let err = client
            .review(ReviewRequest {
                mode: Some("base".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Invalid(CommandError::MissingBase)));

        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_resume_trusts_caller_id() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new([started(&id)]);
        let client = client(&launcher);

        let outcome = client
            .resume(ResumeRequest {
                session_id: Some(id.clone()),
                prompt: Some("continue".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(outcome.session_id, id);
        assert!(client.sessions().is_empty());
        assert_eq!(launcher.records()[0].cwd, None);
    }

    #[tokio::test]
    async fn test_review_missing_session_id() {
        let launcher = ScriptedLauncher::new(["review text without ids"]);
        let client = client(&launcher);

        let err = client
            .review(ReviewRequest {
                mode: Some("uncommitted".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Runner(RunnerError::MissingSessionId { .. })));
        assert!(err.to_string().contains("codex review"));
    }
}
