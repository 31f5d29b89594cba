//! codex-bridge-runner - Codex CLI wrapper
//!
//! Executes `codex exec --json`, parses its event stream and extracts the
//! session id needed to resume the conversation later.
//!
//! # Example
//!
//! ```no_run
//! use codex_bridge_runner::{CodexClient, CodexRunner, StartRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CodexClient::new(CodexRunner::new("codex"));
//!
//!     let outcome = client
//!         .start(StartRequest {
//!             prompt: Some("Summarize this repository".to_string()),
//!             cwd: Some("/path/to/project".to_string()),
//!         })
//!         .await?;
//!
//!     println!("{}\n[SESSION_ID: {}]", outcome.display_text, outcome.session_id);
//!     Ok(())
//! }
//! ```

mod client;
mod commands;
mod extractor;
mod launcher;
mod runner;
mod sessions;
mod types;

pub use client::{ClientError, CodexClient};
pub use commands::{
    CommandError, ResumeRequest, ReviewMode, ReviewRequest, StartRequest, SANDBOX_READ_ONLY,
};
pub use extractor::{find_session_id_in_text, parse_event_line, EventExtractor, ExtractedOutput};
pub use launcher::{
    ExitFuture, LaunchRecord, ProcessLauncher, ScriptedLauncher, SpawnedProcess, TokioLauncher,
};
pub use runner::{CodexRunner, DEFAULT_CODEX_BIN};
pub use sessions::{SessionRecord, SessionRegistry};
pub use types::*;
