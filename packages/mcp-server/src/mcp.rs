// ABOUTME: Model Context Protocol message types and lifecycle handlers
// ABOUTME: Initialize, ping, logging, and empty resource/prompt listings for the RLM tool server

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "rlm";

// MCP Protocol Types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub roots: Option<RootsCapability>,
    pub sampling: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub logging: Option<Value>,
    pub prompts: Option<PromptsCapability>,
    pub resources: Option<ResourcesCapability>,
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesCapability {
    pub subscribe: Option<bool>,
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingLevel {
    pub level: String,
}

// MCP Protocol Handlers
pub async fn initialize(request: Option<InitializeRequest>) -> Result<InitializeResult> {
    if let Some(request) = &request {
        tracing::info!(
            "Client {} {} connected (protocol {})",
            request.client_info.name,
            request.client_info.version,
            request.protocol_version
        );
    }

    Ok(InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            logging: None,
            prompts: Some(PromptsCapability {
                list_changed: Some(false),
            }),
            resources: Some(ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

pub async fn ping(_request: Option<Value>) -> Result<Value> {
    Ok(json!({}))
}

pub async fn logging_set_level(request: Option<LoggingLevel>) -> Result<Value> {
    if let Some(request) = request {
        // Filtering is fixed at startup through RUST_LOG
        tracing::debug!("Client requested log level {}", request.level);
    }
    Ok(json!({}))
}

pub async fn resources_list(_request: Option<Value>) -> Result<Value> {
    Ok(json!({
        "resources": [],
        "nextCursor": null
    }))
}

pub async fn prompts_list(_request: Option<Value>) -> Result<Value> {
    Ok(json!({
        "prompts": [],
        "nextCursor": null
    }))
}
