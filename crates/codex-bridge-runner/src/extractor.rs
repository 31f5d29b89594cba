//! Event extraction from `codex exec --json` stdout
//!
//! Lines are classified one at a time as they arrive. The session id comes
//! from the first `thread.started` record; if none parses, a pattern scan of
//! the whole transcript is tried once the stream has ended.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::{AgentEvent, RawEvent, RawItem};

/// `thread_id` followed by a few delimiter characters and a lowercase UUID
static THREAD_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"thread_id\W{0,5}([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})")
        .unwrap()
});

/// Classify a single stdout line. Never fails: anything that is not one of the
/// recognized records is `Unrecognized`.
pub fn parse_event_line(line: &str) -> AgentEvent {
    let line = line.trim();
    if line.is_empty() {
        return AgentEvent::Unrecognized;
    }

    match serde_json::from_str::<RawEvent>(line) {
        Ok(RawEvent::ThreadStarted { thread_id }) if !thread_id.is_empty() => {
            AgentEvent::SessionStarted { thread_id }
        }
        Ok(RawEvent::ItemCompleted {
            item: RawItem::AgentMessage { text },
        }) if !text.is_empty() => AgentEvent::AgentMessage { text },
        _ => AgentEvent::Unrecognized,
    }
}

/// Fallback: scan raw text for `thread_id` followed by a UUID
pub fn find_session_id_in_text(text: &str) -> Option<String> {
    THREAD_ID_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// What the extractor saw once the stream is over
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedOutput {
    pub session_id: Option<String>,
    pub final_message: Option<String>,
    pub raw_output: String,
}

impl ExtractedOutput {
    /// Final agent message if there was one, else the raw transcript
    pub fn display_text(&self) -> &str {
        match self.final_message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => &self.raw_output,
        }
    }
}

/// Incremental accumulator for one subprocess's stdout
#[derive(Debug, Default)]
pub struct EventExtractor {
    raw_output: String,
    session_id: Option<String>,
    final_message: Option<String>,
}

impl EventExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its trailing newline)
    pub fn push_line(&mut self, line: &str) {
        self.raw_output.push_str(line);
        self.raw_output.push('\n');

        match parse_event_line(line) {
            AgentEvent::SessionStarted { thread_id } => {
                if let Some(existing) = &self.session_id {
                    debug!(%existing, ignored = %thread_id, "Duplicate thread.started, keeping first");
                } else {
                    debug!(%thread_id, "Session started");
                    self.session_id = Some(thread_id);
                }
            }
            AgentEvent::AgentMessage { text } => {
                self.final_message = Some(text);
            }
            AgentEvent::Unrecognized => {}
        }
    }

    /// Session id captured so far from structured records
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// End of stream: apply the pattern fallback if needed
    pub fn finish(self) -> ExtractedOutput {
        let session_id = self.session_id.or_else(|| {
            let found = find_session_id_in_text(&self.raw_output);
            if let Some(id) = &found {
                debug!(session_id = %id, "Recovered session id from raw output");
            }
            found
        });

        ExtractedOutput {
            session_id,
            final_message: self.final_message,
            raw_output: self.raw_output,
        }
    }
}
