//! Argument vectors for `codex exec`
//!
//! Each request type validates its own parameters and produces the argument
//! list (program name excluded). Validation happens before anything is spawned.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Sandbox policy passed to every new session
pub const SANDBOX_READ_ONLY: &str = "read-only";

/// Validation errors, raised before codex is spawned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("mode 'base' requires a non-empty 'base' branch")]
    MissingBase,

    #[error("mode 'commit' requires a non-empty 'commit' reference")]
    MissingCommit,

    #[error("mode 'custom' requires a non-empty 'prompt'")]
    MissingPrompt,

    #[error("unknown review mode: {0}")]
    UnknownMode(String),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn push_cwd(args: &mut Vec<String>, cwd: Option<&str>) {
    if let Some(dir) = cwd {
        args.push("-C".to_string());
        args.push(dir.to_string());
    }
}

/// `codex` tool: start a new read-only session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

impl StartRequest {
    /// `exec <prompt> --sandbox read-only [-C <cwd>] --json`
    pub fn to_args(&self) -> Result<Vec<String>, CommandError> {
        let prompt = non_empty(&self.prompt).ok_or(CommandError::MissingParameter("prompt"))?;

        let mut args = vec![
            "exec".to_string(),
            prompt.to_string(),
            "--sandbox".to_string(),
            SANDBOX_READ_ONLY.to_string(),
        ];
        push_cwd(&mut args, non_empty(&self.cwd));
        args.push("--json".to_string());
        Ok(args)
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        non_empty(&self.cwd).map(PathBuf::from)
    }
}

/// `codex-reply` tool: continue an existing session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ResumeRequest {
    /// `exec --json resume <sessionId> <prompt>`
    pub fn to_args(&self) -> Result<Vec<String>, CommandError> {
        let session_id =
            non_empty(&self.session_id).ok_or(CommandError::MissingParameter("sessionId"))?;
        let prompt = non_empty(&self.prompt).ok_or(CommandError::MissingParameter("prompt"))?;

        Ok(vec![
            "exec".to_string(),
            "--json".to_string(),
            "resume".to_string(),
            session_id.to_string(),
            prompt.to_string(),
        ])
    }
}

/// What `codex exec review` should look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// Staged, unstaged and untracked changes
    Uncommitted,
    /// Changes against a base branch
    Base,
    /// A single commit
    Commit,
    /// Free-form review instructions
    Custom,
}

impl ReviewMode {
    pub const ALL: [ReviewMode; 4] = [
        ReviewMode::Uncommitted,
        ReviewMode::Base,
        ReviewMode::Commit,
        ReviewMode::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewMode::Uncommitted => "uncommitted",
            ReviewMode::Base => "base",
            ReviewMode::Commit => "commit",
            ReviewMode::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CommandError> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| CommandError::UnknownMode(value.to_string()))
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `codex-review` tool
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

impl ReviewRequest {
    pub fn mode(&self) -> Result<ReviewMode, CommandError> {
        let mode = non_empty(&self.mode).ok_or(CommandError::MissingParameter("mode"))?;
        ReviewMode::parse(mode)
    }

    /// `exec [-C <cwd>] --json review (--uncommitted | --base <b> | --commit <c> | <prompt>)`
    ///
    /// `--json` has to come before `review`, otherwise the review subcommand
    /// parses it as its own argument.
    pub fn to_args(&self) -> Result<Vec<String>, CommandError> {
        let target = match self.mode()? {
            ReviewMode::Uncommitted => vec!["--uncommitted".to_string()],
            ReviewMode::Base => {
                let base = non_empty(&self.base).ok_or(CommandError::MissingBase)?;
                vec!["--base".to_string(), base.to_string()]
            }
            ReviewMode::Commit => {
                let commit = non_empty(&self.commit).ok_or(CommandError::MissingCommit)?;
                vec!["--commit".to_string(), commit.to_string()]
            }
            ReviewMode::Custom => {
                let prompt = self
                    .prompt
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .ok_or(CommandError::MissingPrompt)?;
                vec![prompt.to_string()]
            }
        };

        let mut args = vec!["exec".to_string()];
        push_cwd(&mut args, non_empty(&self.cwd));
        args.push("--json".to_string());
        args.push("review".to_string());
        args.extend(target);
        Ok(args)
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        non_empty(&self.cwd).map(PathBuf::from)
    }
}
