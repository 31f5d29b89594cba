//! Types for `codex exec --json` output
//!
//! The Codex CLI emits one JSON record per line on stdout. Only two record
//! shapes matter here; everything else is carried through as raw text.

use serde::Deserialize;
use std::time::Duration;

/// Raw event record, as written by `codex exec --json`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawEvent {
    /// A new thread (session) was started
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: String,
    },
    /// An item finished; `item.type` tells what kind
    #[serde(rename = "item.completed")]
    ItemCompleted { item: RawItem },
    #[serde(other)]
    Other,
}

/// Item payload of an `item.completed` record
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawItem {
    #[serde(rename = "agent_message")]
    AgentMessage {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// A single stdout line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// `thread.started` with a non-empty `thread_id`
    SessionStarted { thread_id: String },
    /// `item.completed` carrying a non-empty agent message
    AgentMessage { text: String },
    /// Anything else, including lines that are not JSON at all
    Unrecognized,
}

/// Result of one successful Codex CLI execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Session (thread) id, usable with `exec resume`
    pub session_id: String,
    /// Final agent message, or the raw transcript when there was none
    pub display_text: String,
    /// Last agent message seen on the stream, if any
    pub final_message: Option<String>,
    /// Every stdout line, newline-terminated, in order
    pub raw_output: String,
    /// Process exit code (always 0 for a successful outcome)
    pub exit_code: i32,
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("{label}: failed to spawn codex: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: codex exited with {}{}", exit_code_text(.code), stderr_suffix(.stderr))]
    NonZeroExit {
        label: String,
        code: Option<i32>,
        stderr: Vec<String>,
    },

    #[error("{label}: no session id found in codex output")]
    MissingSessionId { label: String },

    #[error("{label}: codex timed out after {after:?}")]
    Timeout { label: String, after: Duration },

    #[error("{label}: IO error: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Label of the invocation that failed
    pub fn label(&self) -> &str {
        match self {
            RunnerError::Spawn { label, .. }
            | RunnerError::NonZeroExit { label, .. }
            | RunnerError::MissingSessionId { label }
            | RunnerError::Timeout { label, .. }
            | RunnerError::Io { label, .. } => label,
        }
    }
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}

fn stderr_suffix(stderr: &[String]) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thread_started() {
        let json = r#"{"type":"thread.started","thread_id":"0199a213-81c0-7800-8aa1-bbab2a035a53"}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        match event {
            RawEvent::ThreadStarted { thread_id } => {
                assert_eq!(thread_id, "0199a213-81c0-7800-8aa1-bbab2a035a53");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_item_completed() {
        let json = r#"{
            "type": "item.completed",
            "item": {"id": "item_3", "type": "agent_message", "text": "Done."}
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            RawEvent::ItemCompleted { item: RawItem::AgentMessage { ref text } } if text == "Done."
        ));
    }

    #[test]
    fn test_parse_unknown_types() {
        let event: RawEvent = serde_json::from_str(r#"{"type":"turn.started"}"#).unwrap();
        assert!(matches!(event, RawEvent::Other));

        let event: RawEvent = serde_json::from_str(
            r#"{"type":"item.completed","item":{"type":"command_execution","command":"ls"}}"#,
        )
        .unwrap();
        assert!(matches!(event, RawEvent::ItemCompleted { item: RawItem::Other }));
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = RunnerError::NonZeroExit {
            label: "codex exec".to_string(),
            code: Some(2),
            stderr: vec!["error: unexpected argument".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("codex exec"));
        assert!(message.contains("exit code 2"));
        assert!(message.contains("unexpected argument"));

        let err = RunnerError::NonZeroExit {
            label: "codex review".to_string(),
            code: None,
            stderr: Vec::new(),
        };
        assert_eq!(err.to_string(), "codex review: codex exited with signal");
    }
}
