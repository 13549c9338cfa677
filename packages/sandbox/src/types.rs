// ABOUTME: Request and response types exchanged with the external sandbox process
// ABOUTME: Includes the execute contract, health payload, and the recursive callback shapes

use rlm_core::Context;
use serde::{Deserialize, Serialize};

/// Code execution request as built by the orchestrator.
///
/// `depth` and `max_depth` are signed so that out-of-range values coming from
/// untrusted callers can be rejected by validation instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxExecuteRequest {
    pub session_id: String,
    pub code: String,
    pub context: Context,
    pub callback_url: Option<String>,
    pub depth: i32,
    pub max_depth: i32,
}

impl SandboxExecuteRequest {
    /// Callback target with surrounding whitespace removed; blank counts as absent
    pub fn effective_callback_url(&self) -> Option<&str> {
        self.callback_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Body of `POST {sandbox}/execute`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireExecuteRequest {
    pub session_id: String,
    pub code: String,
    pub context: Context,
    /// Empty when recursion callbacks are disabled
    pub callback_url: String,
    pub depth: i32,
    pub max_depth: i32,
}

impl From<&SandboxExecuteRequest> for WireExecuteRequest {
    fn from(request: &SandboxExecuteRequest) -> Self {
        Self {
            session_id: request.session_id.clone(),
            code: request.code.clone(),
            context: request.context.clone(),
            callback_url: request
                .effective_callback_url()
                .unwrap_or_default()
                .to_string(),
            depth: request.depth,
            max_depth: request.max_depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxExecuteResponse {
    pub session_id: String,
    pub result: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Recursive calls made while running the code
    #[serde(default)]
    pub call_count: u64,
}

/// Body of `GET {sandbox}/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

/// Body the sandbox posts to `{callback_url}/rlm/recurse`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecursiveCallRequest {
    pub session_id: String,
    pub prompt: String,
    #[serde(default)]
    pub context: Context,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecursiveCallResponse {
    pub result: String,
}
