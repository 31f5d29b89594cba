//! MCP Server implementation
//!
//! Reads newline-delimited JSON-RPC frames, dispatches them, and writes
//! responses through a single writer task. Tool calls run as their own tasks,
//! so their responses may go out in a different order than the requests came in.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::protocol::{self, Request, RequestId, Response, RpcError};
use crate::tools::{self, ToolResult};

/// Server information
const SERVER_NAME: &str = "codex-bridge";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Usage policy returned from `initialize`
const INSTRUCTIONS: &str = "Use the `codex` tool to start a read-only Codex session. Every answer ends \
with a [SESSION_ID: ...] marker: keep it, and continue the same conversation with `codex-reply` \
and that session id instead of starting a new session. Use `codex-review` to review uncommitted \
changes, a branch against its base, a single commit, or with custom review instructions.";

/// MCP Server capabilities
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        ServerCapabilities {
            tools: true,
            resources: true,
        }
    }
}

impl ServerCapabilities {
    fn to_json(&self) -> Value {
        let mut caps = serde_json::Map::new();
        if self.tools {
            caps.insert("tools".to_string(), json!({}));
        }
        if self.resources {
            caps.insert("resources".to_string(), json!({}));
        }
        Value::Object(caps)
    }
}

/// Tool handler trait
///
/// Implement this trait to handle tool calls. An `Err` becomes a JSON-RPC
/// error response.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Handle a tool call
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, RpcError>;
}

/// Handshake state; every method is served in either state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Ready,
}

/// MCP Server
pub struct McpServer<H: ToolHandler> {
    handler: Arc<H>,
    capabilities: ServerCapabilities,
    state: ServerState,
}

impl<H: ToolHandler> McpServer<H> {
    /// Create a new MCP server with a tool handler
    pub fn new(handler: H) -> Self {
        McpServer {
            handler: Arc::new(handler),
            capabilities: ServerCapabilities::default(),
            state: ServerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Run the server on stdio
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("Starting MCP server on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve frames from `reader`, writing responses to `writer`
    ///
    /// Returns once `reader` hits EOF and every outstanding tool call has
    /// been answered.
    pub async fn serve<R, W>(&mut self, mut reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, rx) = mpsc::unbounded_channel();
        let writer_handle = tokio::spawn(write_responses(writer, rx));

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut buf).await?;
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);
            self.handle_message(line, &outbound);
        }

        drop(outbound);
        writer_handle.await??;
        Ok(())
    }

    /// Handle a single JSON-RPC message; malformed frames are logged and dropped
    fn handle_message(&mut self, message: &str, outbound: &UnboundedSender<Response>) {
        match protocol::parse_request_str(message) {
            Ok(request) => self.handle_request(request, outbound),
            Err(err) => warn!(error = %err, "Ignoring malformed frame: {}", message),
        }
    }

    /// Handle a parsed request
    fn handle_request(&mut self, request: Request, outbound: &UnboundedSender<Response>) {
        let Request {
            method, params, id, ..
        } = request;
        let params = params.unwrap_or(Value::Null);

        let result = match method.as_str() {
            "initialize" => Ok(self.handle_initialize(params)),
            "initialized" | "notifications/initialized" => Ok(json!({})),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::all_tools() })),
            "resources/list" => Ok(json!({ "resources": [] })),
            "tools/call" => {
                match id {
                    Some(id) => self.handle_tools_call(id, params, outbound.clone()),
                    None => warn!("Ignoring tools/call sent as a notification"),
                }
                return;
            }
            _ => Err(RpcError::MethodNotFound(method.clone())),
        };

        let Some(id) = id else {
            debug!(%method, "Notification handled");
            return;
        };

        let response = match result {
            Ok(value) => Response::success(id, value),
            Err(err) => {
                warn!("Unknown method: {}", method);
                Response::from_error(id, err)
            }
        };
        send(outbound, response);
    }

    /// Handle initialize request
    fn handle_initialize(&mut self, _params: Value) -> Value {
        self.state = ServerState::Ready;
        info!("MCP server initialized");

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": self.capabilities.to_json(),
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            },
            "instructions": INSTRUCTIONS,
        })
    }

    /// Handle tools/call request; the call itself runs on its own task
    fn handle_tools_call(&self, id: RequestId, params: Value, outbound: UnboundedSender<Response>) {
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                send(
                    &outbound,
                    Response::from_error(id, RpcError::InvalidParams("Missing 'name' field".to_string())),
                );
                return;
            }
        };

        if tools::get_tool(&name).is_none() {
            send(
                &outbound,
                Response::from_error(id, RpcError::InvalidParams(format!("Unknown tool: {}", name))),
            );
            return;
        }

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        debug!("Calling tool: {} with args: {:?}", name, arguments);

        let handler = self.handler.clone();
        tokio::spawn(async move {
            let response = match handler.call(&name, arguments).await {
                Ok(result) => match serde_json::to_value(result) {
                    Ok(value) => Response::success(id, value),
                    Err(e) => Response::from_error(id, RpcError::InternalError(e.to_string())),
                },
                Err(err) => {
                    warn!(tool = %name, error = %err, "Tool call failed");
                    Response::from_error(id, err)
                }
            };
            send(&outbound, response);
        });
    }
}

fn send(outbound: &UnboundedSender<Response>, response: Response) {
    if outbound.send(response).is_err() {
        warn!("Response dropped: writer has shut down");
    }
}

/// Sole owner of the output stream
async fn write_responses<W>(mut writer: W, mut rx: UnboundedReceiver<Response>) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = protocol::serialize_response_string(&response)?;
        debug!("Sending: {}", response_json);

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
