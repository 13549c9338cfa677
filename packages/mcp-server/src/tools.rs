// ABOUTME: MCP tool definitions and dispatch for the RLM engine
// ABOUTME: Exposes recursive execution, chunk exploration, and sandbox health as tools

use anyhow::{anyhow, Result};
use rlm_core::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::context::ToolContext;

// MCP Tool Types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsRequest {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub type_name: String,
    pub properties: HashMap<String, ToolInputSchemaProperty>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchemaProperty {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    pub name: String,
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl CallToolResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: Some(is_error),
        }
    }
}

// Request types for our tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteToolRequest {
    pub query: String,
    #[serde(default)]
    pub context: Context,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreToolRequest {
    pub query: String,
    pub file_paths: Vec<String>,
    pub window_size: Option<usize>,
    pub overlap: Option<usize>,
    pub max_files: Option<usize>,
    pub max_chunks: Option<usize>,
    pub max_concurrent: Option<usize>,
}

fn property(type_name: &str, description: &str) -> ToolInputSchemaProperty {
    ToolInputSchemaProperty {
        type_name: Some(type_name.to_string()),
        description: Some(description.to_string()),
        enum_values: None,
    }
}

// Tool handlers
pub async fn tools_list(_request: Option<ListToolsRequest>) -> Result<ListToolsResult> {
    let execute_properties = HashMap::from([
        (
            "query".to_string(),
            property("string", "Question or task for the recursive model"),
        ),
        (
            "context".to_string(),
            property(
                "object",
                "Map of context keys (file names, labels) to their text content",
            ),
        ),
        (
            "max_depth".to_string(),
            property("integer", "Maximum recursion depth (1-10)"),
        ),
    ]);

    let execute_tool = Tool {
        name: "rlm_execute".to_string(),
        description: Some("Answer a question over a large context by letting the model write Python that inspects the context and recursively delegates sub-questions to itself. Returns the answer together with the execution trace.".to_string()),
        input_schema: ToolInputSchema {
            type_name: "object".to_string(),
            properties: execute_properties,
            required: vec!["query".to_string()],
        },
    };

    let explore_properties = HashMap::from([
        (
            "query".to_string(),
            property("string", "Question to answer from the files"),
        ),
        (
            "file_paths".to_string(),
            property("array", "Paths of the files to analyse, in priority order"),
        ),
        (
            "window_size".to_string(),
            property("integer", "Lines per chunk"),
        ),
        (
            "overlap".to_string(),
            property("integer", "Lines shared by consecutive chunks"),
        ),
        (
            "max_files".to_string(),
            property("integer", "Maximum number of readable files to load"),
        ),
        (
            "max_chunks".to_string(),
            property("integer", "Maximum number of chunks to analyse"),
        ),
        (
            "max_concurrent".to_string(),
            property("integer", "Maximum concurrent model requests"),
        ),
    ]);

    let explore_tool = Tool {
        name: "rlm_explore".to_string(),
        description: Some("Analyse files too large for one prompt: split them into overlapping line windows, summarize each in parallel with the secondary model, drop irrelevant chunks, and aggregate the rest into one answer.".to_string()),
        input_schema: ToolInputSchema {
            type_name: "object".to_string(),
            properties: explore_properties,
            required: vec!["query".to_string(), "file_paths".to_string()],
        },
    };

    let health_tool = Tool {
        name: "sandbox_health".to_string(),
        description: Some("Check that the Python execution sandbox is reachable.".to_string()),
        input_schema: ToolInputSchema {
            type_name: "object".to_string(),
            properties: HashMap::new(),
            required: vec![],
        },
    };

    Ok(ListToolsResult {
        tools: vec![execute_tool, explore_tool, health_tool],
        next_cursor: None,
    })
}

pub async fn tools_call(
    request: Option<CallToolRequest>,
    context: &ToolContext,
) -> Result<CallToolResult> {
    let request = request.ok_or_else(|| anyhow!("Missing tool call parameters"))?;
    let arguments = request.arguments.unwrap_or_else(|| json!({}));

    info!("Calling tool {}", request.name);

    match request.name.as_str() {
        "rlm_execute" => rlm_execute(serde_json::from_value(arguments)?, context).await,
        "rlm_explore" => rlm_explore(serde_json::from_value(arguments)?, context).await,
        "sandbox_health" => sandbox_health(context).await,
        other => Err(anyhow!("Unknown tool: {}", other)),
    }
}

async fn rlm_execute(request: ExecuteToolRequest, context: &ToolContext) -> Result<CallToolResult> {
    let cancel = context.call_token();
    let result = context
        .orchestrator()
        .execute(&request.query, request.context, request.max_depth, &cancel)
        .await;

    let is_error = !result.is_success();
    Ok(CallToolResult::text(
        serde_json::to_string_pretty(&result)?,
        is_error,
    ))
}

async fn rlm_explore(request: ExploreToolRequest, context: &ToolContext) -> Result<CallToolResult> {
    let explorer = context.explorer();
    let mut options = explorer.defaults().clone();
    if let Some(window_size) = request.window_size {
        options.window_size = window_size;
    }
    if let Some(overlap) = request.overlap {
        options.overlap = overlap;
    }
    if let Some(max_files) = request.max_files {
        options.max_files = max_files;
    }
    if let Some(max_chunks) = request.max_chunks {
        options.max_chunks = max_chunks;
    }
    if let Some(max_concurrent) = request.max_concurrent {
        options.max_concurrent_requests = max_concurrent;
    }

    let cancel = context.call_token();
    let result = explorer
        .explore(&request.query, &request.file_paths, &options, &cancel)
        .await;

    let is_error = !result.is_success();
    Ok(CallToolResult::text(
        serde_json::to_string_pretty(&result)?,
        is_error,
    ))
}

async fn sandbox_health(context: &ToolContext) -> Result<CallToolResult> {
    let cancel = context.call_token();
    match context.sandbox().health(&cancel).await {
        Ok(status) => Ok(CallToolResult::text(
            serde_json::to_string_pretty(&status)?,
            false,
        )),
        Err(err) => {
            warn!("Sandbox health check failed: {}", err);
            Ok(CallToolResult::text(
                serde_json::to_string_pretty(&json!({
                    "status": "unreachable",
                    "error": err.to_string()
                }))?,
                true,
            ))
        }
    }
}
