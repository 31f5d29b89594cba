//! Codex tool handler
//!
//! Maps the `codex`, `codex-reply` and `codex-review` tools onto
//! [`CodexClient`] and formats the outcome as an MCP tool result.

use codex_bridge_runner::{ClientError, CodexClient, ExecOutcome, SessionRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::protocol::RpcError;
use crate::server::ToolHandler;
use crate::tools::{ToolResult, TOOL_CODEX, TOOL_CODEX_REPLY, TOOL_CODEX_REVIEW};

/// Tool handler backed by the Codex CLI
pub struct CodexToolHandler {
    client: CodexClient,
}

impl CodexToolHandler {
    pub fn new(client: CodexClient) -> Self {
        Self { client }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.client.sessions()
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<ExecOutcome, RpcError> {
        let result = match name {
            TOOL_CODEX => self.client.start(parse_arguments(arguments)?).await,
            TOOL_CODEX_REPLY => self.client.resume(parse_arguments(arguments)?).await,
            TOOL_CODEX_REVIEW => self.client.review(parse_arguments(arguments)?).await,
            other => return Err(RpcError::InvalidParams(format!("Unknown tool: {}", other))),
        };

        result.map_err(|err: ClientError| {
            warn!(tool = %name, error = %err, "Codex invocation failed");
            RpcError::InternalError(err.to_string())
        })
    }
}

/// Wrong JSON types are a protocol error; missing fields are left to the builders
fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, RpcError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

#[async_trait::async_trait]
impl ToolHandler for CodexToolHandler {
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, RpcError> {
        let outcome = self.dispatch(name, arguments).await?;
        Ok(ToolResult::with_session(outcome.display_text, &outcome.session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolContent;
    use codex_bridge_runner::{CodexRunner, ScriptedLauncher};
    use serde_json::json;
    use std::sync::Arc;

    fn handler(launcher: &ScriptedLauncher) -> CodexToolHandler {
        let runner = CodexRunner::with_launcher("codex", Arc::new(launcher.clone()));
        CodexToolHandler::new(CodexClient::new(runner))
    }

    fn transcript(id: &str, message: &str) -> Vec<String> {
        vec![
            format!(r#"{{"type":"thread.started","thread_id":"{}"}}"#, id),
            r#"{"type":"turn.started"}"#.to_string(),
            format!(
                r#"{{"type":"item.completed","item":{{"id":"item_0","type":"agent_message","text":"{}"}}}}"#,
                message
            ),
            r#"{"type":"turn.completed"}"#.to_string(),
        ]
    }

    fn texts(result: &ToolResult) -> Vec<String> {
        result
            .content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_start_returns_message_and_session() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new(transcript(&id, "Looks fine."));
        let handler = handler(&launcher);

        let result = handler
            .call("codex", json!({"prompt": "hello", "cwd": "/repo"}))
            .await
            .unwrap();

        assert_eq!(texts(&result), ["Looks fine.".to_string(), format!("[SESSION_ID: {}]", id)]);
        assert!(handler.sessions().contains(&id));

        let args = &launcher.records()[0].args;
        assert!(args.contains(&"read-only".to_string()));
        assert_eq!(launcher.records()[0].cwd.as_deref(), Some("/repo"));
    }

    #[tokio::test]
    async fn test_reply_without_local_session() {
        let id = uuid::Uuid::new_v4().to_string();
        let launcher = ScriptedLauncher::new(transcript(&id, "Continuing."));
        let handler = handler(&launcher);

        let result = handler
            .call("codex-reply", json!({"sessionId": id, "prompt": "next step"}))
            .await
            .unwrap();

        assert_eq!(texts(&result)[1], format!("[SESSION_ID: {}]", id));
        assert!(handler.sessions().is_empty());
        assert_eq!(
            launcher.records()[0].args,
            ["exec", "--json", "resume", id.as_str(), "next step"]
        );
    }

    #[tokio::test]
    async fn test_reply_missing_fields_never_spawns() {
        let launcher = ScriptedLauncher::new(transcript("x", "y"));
        let handler = handler(&launcher);

        for arguments in [json!({}), json!({"prompt": "p"}), json!({"sessionId": "s"}), Value::Null] {
            let err = handler.call("codex-reply", arguments).await.unwrap_err();
            assert_eq!(err.code(), -32603);
            assert!(err.message().contains("missing required parameter"));
        }
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_review_validation_messages() {
        let launcher = ScriptedLauncher::new(transcript("x", "y"));
        let handler = handler(&launcher);

        let cases = [
            (json!({"mode": "base"}), "'base'"),
            (json!({"mode": "commit"}), "'commit'"),
            (json!({"mode": "custom", "prompt": " "}), "'prompt'"),
            (json!({"mode": "everything"}), "unknown review mode: everything"),
            (json!({}), "missing required parameter: mode"),
        ];
        for (arguments, expected) in cases {
            let err = handler.call("codex-review", arguments).await.unwrap_err();
            assert_eq!(err.code(), -32603);
            assert!(err.message().contains(expected), "{} !~ {}", err.message(), expected);
        }
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_argument_types() {
        let launcher = ScriptedLauncher::new(transcript("x", "y"));
        let handler = handler(&launcher);

        let err = handler.call("codex", json!({"prompt": 42})).await.unwrap_err();
        assert_eq!(err.code(), -32602);
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_runner_failures_are_internal_errors() {
        let launcher = ScriptedLauncher::new(["no ids here"]);
        let err = handler(&launcher)
            .call("codex-review", json!({"mode": "uncommitted"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32603);
        assert!(err.message().contains("no session id"));

        let launcher = ScriptedLauncher::failing(std::io::ErrorKind::NotFound);
        let err = handler(&launcher)
            .call("codex", json!({"prompt": "hi"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32603);
        assert!(err.message().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let launcher = ScriptedLauncher::new(Vec::<String>::new());
        let err = handler(&launcher).call("gemini", json!({})).await.unwrap_err();
        assert_eq!(err.code(), -32602);
    }
}
