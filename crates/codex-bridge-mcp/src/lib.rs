//! MCP (Model Context Protocol) Server for the Codex CLI
//!
//! Exposes Codex as three tools over JSON-RPC 2.0 on stdio:
//!
//! - `codex`: start a new read-only session
//! - `codex-reply`: continue a session by id
//! - `codex-review`: review uncommitted changes, a base branch, a commit, or
//!   with custom instructions
//!
//! Every successful result ends with a `[SESSION_ID: <id>]` marker.
//!
//! # Example
//!
//! ```no_run
//! use codex_bridge_mcp::{CodexToolHandler, McpServer};
//! use codex_bridge_runner::{CodexClient, CodexRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CodexClient::new(CodexRunner::new("codex"));
//!     let mut server = McpServer::new(CodexToolHandler::new(client));
//!     server.run().await
//! }
//! ```

pub mod handler;
pub mod protocol;
pub mod server;
pub mod tools;

// Re-exports for convenience
pub use handler::CodexToolHandler;
pub use protocol::{Request, RequestId, Response, RpcError};
pub use server::{McpServer, ServerCapabilities, ServerState, ToolHandler};
pub use tools::{all_tools, get_tool, ToolContent, ToolDefinition, ToolResult};
