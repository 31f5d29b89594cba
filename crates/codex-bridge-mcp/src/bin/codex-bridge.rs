//! codex-bridge - MCP stdio server for the Codex CLI
//!
//! Intended to be launched by an MCP client. Each tool call runs
//! `codex exec --json` and relays the answer together with the session id.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use codex_bridge_mcp::{CodexToolHandler, McpServer};
use codex_bridge_runner::{CodexClient, CodexRunner, DEFAULT_CODEX_BIN};

#[derive(Parser, Debug)]
#[command(name = "codex-bridge")]
#[command(about = "MCP server exposing the Codex CLI as resumable tools")]
#[command(version)]
struct Args {
    /// Codex executable to run
    #[arg(long, env = "CODEX_BIN", default_value = DEFAULT_CODEX_BIN)]
    codex_bin: String,

    /// Kill codex runs that take longer than this many seconds (no limit by default)
    #[arg(long, env = "CODEX_BRIDGE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Working directory for calls that do not pass `cwd`
    #[arg(long, env = "CODEX_BRIDGE_CWD")]
    cwd: Option<PathBuf>,
}

fn log_filter() -> tracing_subscriber::EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("CODEX_BRIDGE_LOG_LEVEL") {
        match v.as_str() {
            "silent" => "off".to_string(),
            "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    } else {
        "warn".to_string()
    };

    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let runner = CodexRunner::new(args.codex_bin)
        .with_timeout(args.timeout_secs.map(Duration::from_secs));
    let client = CodexClient::new(runner).with_default_cwd(args.cwd);
    let mut server = McpServer::new(CodexToolHandler::new(client));

    // A pending stdin read would hold up runtime shutdown, so signals exit directly
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
            std::process::exit(0);
        }
        _ = terminate() => {
            info!("Terminated, exiting");
            std::process::exit(0);
        }
    }

    Ok(())
}
