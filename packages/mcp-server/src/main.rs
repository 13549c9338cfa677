#!/usr/bin/env -S cargo run --bin rlm-mcp --
// ABOUTME: Stdio MCP server entry point for the RLM engine
// ABOUTME: Serves JSON-RPC over stdin/stdout and hosts the sandbox callback listener

use anyhow::{Context as _, Result};
use clap::Parser;
use rlm_config::RlmConfig;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod context;
mod mcp;
mod tools;

#[cfg(test)]
mod tests;

use context::ToolContext;
use mcp::*;
use tools::{tools_call, tools_list};

#[derive(Parser)]
#[command(name = "rlm-mcp")]
#[command(about = "RLM MCP Server - recursive language model tools over a local model server")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Display available tools")]
    tools: bool,
    #[arg(long, help = "Print the resolved configuration and exit")]
    config: bool,
}

async fn handle_rpc_request(
    method: &str,
    params: Option<Value>,
    context: &ToolContext,
) -> Result<Value> {
    match method {
        "initialize" => {
            let request = if let Some(p) = params {
                Some(serde_json::from_value(p)?)
            } else {
                None
            };
            let result = initialize(request).await?;
            Ok(serde_json::to_value(result)?)
        }
        "ping" => {
            let result = ping(params).await?;
            Ok(result)
        }
        "logging/setLevel" => {
            let request = if let Some(p) = params {
                Some(serde_json::from_value(p)?)
            } else {
                None
            };
            let result = logging_set_level(request).await?;
            Ok(result)
        }
        "resources/list" => {
            let result = resources_list(params).await?;
            Ok(result)
        }
        "prompts/list" => {
            let result = prompts_list(params).await?;
            Ok(result)
        }
        "tools/list" => {
            let request = if let Some(p) = params {
                Some(serde_json::from_value(p)?)
            } else {
                None
            };
            let result = tools_list(request).await?;
            Ok(serde_json::to_value(result)?)
        }
        "tools/call" => {
            let request = if let Some(p) = params {
                Some(serde_json::from_value(p)?)
            } else {
                None
            };
            let result = tools_call(request, context).await?;
            Ok(serde_json::to_value(result)?)
        }
        _ => Err(anyhow::anyhow!("Unknown method: {}", method)),
    }
}

/// Build the JSON-RPC reply for one incoming line; notifications get none
async fn handle_line(line: &str, context: &ToolContext) -> Option<Value> {
    let request: Value = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            warn!("Discarding malformed JSON-RPC message: {}", err);
            return Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": -32700,
                    "message": format!("Parse error: {}", err)
                }
            }));
        }
    };

    let method = request.get("method").and_then(|m| m.as_str())?;
    if method.starts_with("notifications/") {
        // Notifications don't require responses
        return None;
    }

    let params = request.get("params").cloned();
    let response = match handle_rpc_request(method, params, context).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "id": request.get("id"),
            "result": result
        }),
        Err(error) => {
            error!("Request {} failed: {}", method, error);
            json!({
                "jsonrpc": "2.0",
                "id": request.get("id"),
                "error": {
                    "code": -32603,
                    "message": error.to_string()
                }
            })
        }
    };

    Some(response)
}

fn install_signal_handler(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        match Signals::new([SIGINT, SIGTERM]) {
            Ok(mut signals) => {
                std::thread::spawn(move || {
                    if signals.forever().next().is_some() {
                        shutdown.cancel();
                    }
                });
            }
            Err(err) => warn!("Failed to install signal handler: {}", err),
        }
    }

    #[cfg(windows)]
    {
        if let Err(err) = ctrlc::set_handler(move || shutdown.cancel()) {
            warn!("Failed to install Ctrl-C handler: {}", err);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries JSON-RPC, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Err(err) = dotenvy::dotenv() {
        debug!("No .env file loaded: {}", err);
    }

    if cli.tools {
        println!("Available tools:");
        println!("- rlm_execute: Answer a question over a context with recursive code execution");
        println!("- rlm_explore: Map-reduce analysis of large files with the secondary model");
        println!("- sandbox_health: Check the Python execution sandbox");
        return Ok(());
    }

    let config = RlmConfig::from_env().context("Invalid RLM configuration")?;

    if cli.config {
        println!("{:#?}", config);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    install_signal_handler(shutdown.clone());

    let context = ToolContext::from_config(&config, shutdown.clone())?;

    let bind_addr = format!("{}:{}", config.callback.host, config.callback.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind callback listener on {}", bind_addr))?;
    let callback_server = tokio::spawn(rlm_api::serve(
        listener,
        context.orchestrator().clone(),
        shutdown.clone(),
    ));

    info!(
        "RLM MCP server ready: model={} at {}, sandbox={}, callback={}",
        config.model.model,
        config.model.base_url,
        config.sandbox.url,
        config.callback.callback_url()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            // stdin closed by the client
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        if let Some(response) = handle_line(&line, &context).await {
            println!("{}", serde_json::to_string(&response)?);
        }
    }

    info!("Shutting down RLM MCP server");
    shutdown.cancel();
    match callback_server.await {
        Ok(Err(err)) => error!("Callback server error: {}", err),
        Err(err) => error!("Callback server task failed: {}", err),
        Ok(Ok(())) => {}
    }

    Ok(())
}
