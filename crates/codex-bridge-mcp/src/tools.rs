//! MCP Tool definitions
//!
//! This module defines the available MCP tools and their schemas.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Start a new Codex session
pub const TOOL_CODEX: &str = "codex";
/// Continue an existing Codex session
pub const TOOL_CODEX_REPLY: &str = "codex-reply";
/// Run a Codex code review
pub const TOOL_CODEX_REVIEW: &str = "codex-review";

/// Tool definition following MCP schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (e.g., "codex")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool result content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Codex output followed by the session annotation
    pub fn with_session(text: impl Into<String>, session_id: &str) -> Self {
        let mut result = ToolResult::text(text);
        result.content.push(ToolContent::Text {
            text: session_annotation(session_id),
        });
        result
    }
}

/// `[SESSION_ID: <id>]`, the marker callers use to resume
pub fn session_annotation(session_id: &str) -> String {
    format!("[SESSION_ID: {}]", session_id)
}

/// Generate all tool definitions
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            TOOL_CODEX,
            "Start a new Codex session in a read-only sandbox. Returns Codex's answer \
             followed by a [SESSION_ID: ...] marker; pass that id to codex-reply to continue.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Task or question for Codex"
                    },
                    "cwd": {
                        "type": "string",
                        "description": "Working directory for the session (optional)"
                    }
                },
                "required": ["prompt"]
            }),
        ),
        ToolDefinition::new(
            TOOL_CODEX_REPLY,
            "Continue an existing Codex session with a follow-up prompt.",
            json!({
                "type": "object",
                "properties": {
                    "sessionId": {
                        "type": "string",
                        "description": "Session id from a previous [SESSION_ID: ...] marker"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Follow-up prompt"
                    }
                },
                "required": ["sessionId", "prompt"]
            }),
        ),
        ToolDefinition::new(
            TOOL_CODEX_REVIEW,
            "Ask Codex to review code: uncommitted changes, changes against a base branch, \
             a single commit, or custom review instructions.",
            json!({
                "type": "object",
                "properties": {
                    "mode": {
                        "type": "string",
                        "enum": ["uncommitted", "base", "commit", "custom"],
                        "description": "What to review"
                    },
                    "base": {
                        "type": "string",
                        "description": "Base branch to diff against (required when mode is 'base')"
                    },
                    "commit": {
                        "type": "string",
                        "description": "Commit to review (required when mode is 'commit')"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Review instructions (required when mode is 'custom')"
                    },
                    "cwd": {
                        "type": "string",
                        "description": "Repository directory (optional)"
                    }
                },
                "required": ["mode"]
            }),
        ),
    ]
}

/// Get tool by name
pub fn get_tool(name: &str) -> Option<ToolDefinition> {
    all_tools().into_iter().find(|t| t.name == name)
}
