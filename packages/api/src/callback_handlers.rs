// ABOUTME: HTTP request handlers for recursive callbacks issued by sandboxed code
// ABOUTME: Every well-formed callback gets a 200 response whose text carries success or failure

use std::sync::Arc;

use axum::{extract::State, Json};
use rlm_orchestrator::RecursiveOrchestrator;
use rlm_sandbox::{RecursiveCallRequest, RecursiveCallResponse};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state for callback handlers
#[derive(Clone)]
pub struct CallbackState {
    pub orchestrator: Arc<RecursiveOrchestrator>,
    /// Cancels in-flight callbacks when the server shuts down
    pub shutdown: CancellationToken,
}

/// Re-enter the orchestrator for an `rlm_call` made inside the sandbox
///
/// POST /rlm/recurse
pub async fn recurse(
    State(state): State<CallbackState>,
    Json(request): Json<RecursiveCallRequest>,
) -> Json<RecursiveCallResponse> {
    info!(
        "Recursive callback: session={}, depth={}, context_keys={}",
        request.session_id,
        request.depth,
        request.context.len()
    );

    let cancel = state.shutdown.child_token();
    let result = state
        .orchestrator
        .handle_recursive_call(
            &request.session_id,
            &request.prompt,
            request.context,
            request.depth,
            &cancel,
        )
        .await;

    Json(RecursiveCallResponse { result })
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "rlm-orchestrator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
