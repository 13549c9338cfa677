// ABOUTME: HTTP API layer for the RLM engine serving sandbox callbacks
// ABOUTME: Routes recursive re-entry requests to the orchestrator and reports health

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use rlm_orchestrator::RecursiveOrchestrator;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod callback_handlers;

pub use callback_handlers::CallbackState;

/// Creates the callback router the sandbox talks to
pub fn create_router(orchestrator: Arc<RecursiveOrchestrator>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/rlm/recurse", post(callback_handlers::recurse))
        .route("/health", get(callback_handlers::health_check))
        .with_state(CallbackState {
            orchestrator,
            shutdown,
        })
}

/// Serve the callback router on `listener` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    orchestrator: Arc<RecursiveOrchestrator>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Callback API listening on http://{}", addr);
    }

    let router = create_router(orchestrator, shutdown.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
