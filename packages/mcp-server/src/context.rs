// ABOUTME: Shared dependencies for MCP tool handlers
// ABOUTME: Holds the orchestrator, chunk explorer, and sandbox gateway the tools call into

use std::sync::Arc;

use anyhow::{Context as _, Result};
use rlm_ai::{LocalModelService, ModelServiceConfig};
use rlm_config::RlmConfig;
use rlm_explorer::{ChunkExplorer, ExploreOptions};
use rlm_orchestrator::{OrchestratorConfig, RecursiveOrchestrator};
use rlm_sandbox::{HttpSandboxTransport, SandboxGateway};
use tokio_util::sync::CancellationToken;

/// Dependencies shared by every tool invocation
#[derive(Clone)]
pub struct ToolContext {
    pub(crate) orchestrator: Arc<RecursiveOrchestrator>,
    pub(crate) explorer: Arc<ChunkExplorer>,
    pub(crate) sandbox: Arc<SandboxGateway>,
    pub(crate) shutdown: CancellationToken,
}

impl ToolContext {
    pub fn new(
        orchestrator: Arc<RecursiveOrchestrator>,
        explorer: Arc<ChunkExplorer>,
        sandbox: Arc<SandboxGateway>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            explorer,
            sandbox,
            shutdown,
        }
    }

    /// Wire up the production model clients and sandbox transport
    pub fn from_config(config: &RlmConfig, shutdown: CancellationToken) -> Result<Self> {
        let primary = LocalModelService::new(ModelServiceConfig::primary(&config.model))
            .context("Failed to create primary model client")?;
        let secondary = LocalModelService::new(ModelServiceConfig::explorer(&config.model))
            .context("Failed to create explorer model client")?;

        let transport = HttpSandboxTransport::from_config(&config.sandbox)
            .context("Failed to create sandbox client")?;
        let sandbox = Arc::new(SandboxGateway::new(Arc::new(transport)));

        let orchestrator = Arc::new(RecursiveOrchestrator::new(
            Arc::new(primary),
            Arc::clone(&sandbox),
            OrchestratorConfig {
                callback_url: Some(config.callback.callback_url()),
                default_max_depth: config.max_depth,
            },
        ));

        let explorer = Arc::new(ChunkExplorer::with_defaults(
            Arc::new(secondary),
            ExploreOptions::from_config(&config.explorer),
        ));

        Ok(Self::new(orchestrator, explorer, sandbox, shutdown))
    }

    pub fn orchestrator(&self) -> &Arc<RecursiveOrchestrator> {
        &self.orchestrator
    }

    pub fn explorer(&self) -> &Arc<ChunkExplorer> {
        &self.explorer
    }

    pub fn sandbox(&self) -> &Arc<SandboxGateway> {
        &self.sandbox
    }

    /// Token for one tool call; fires when the server shuts down
    pub fn call_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
