// ABOUTME: Unit tests for the MCP server protocol handlers and tools
// ABOUTME: Shared helpers build a tool context over stub model and sandbox implementations

#[cfg(test)]
mod protocol_tests;

#[cfg(test)]
mod tool_tests;


#[cfg(test)]
pub mod test_helpers {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rlm_ai::{AIServiceResult, ModelGateway, TextStream};
    use rlm_explorer::prompts::{AGGREGATION_SYSTEM_PROMPT, NOT_RELEVANT};
    use rlm_explorer::ChunkExplorer;
    use rlm_orchestrator::{OrchestratorConfig, RecursiveOrchestrator};
    use rlm_sandbox::{
        HealthStatus, Result as SandboxResult, SandboxExecuteResponse, SandboxGateway,
        SandboxTransport, WireExecuteRequest,
    };
    use tokio_util::sync::CancellationToken;

    use crate::context::ToolContext;

    pub const GENERATED_CODE: &str = "result = get_context('notes.txt')";
    pub const SANDBOX_RESULT: &str = "42";
    pub const AGGREGATED_ANSWER: &str = "The needle is in notes.txt";

    /// Writes fixed code for the orchestrator and flags chunks mentioning "needle"
    pub struct StubModel;

    #[async_trait]
    impl ModelGateway for StubModel {
        async fn complete(
            &self,
            _prompt: &str,
            _cancel: &CancellationToken,
        ) -> AIServiceResult<String> {
            Ok(format!("```python\n{}\n```", GENERATED_CODE))
        }

        async fn complete_with_system(
            &self,
            system_prompt: &str,
            prompt: &str,
            _cancel: &CancellationToken,
        ) -> AIServiceResult<String> {
            if system_prompt == AGGREGATION_SYSTEM_PROMPT {
                Ok(AGGREGATED_ANSWER.to_string())
            } else if prompt.contains("needle") {
                Ok("Mentions the needle".to_string())
            } else {
                Ok(NOT_RELEVANT.to_string())
            }
        }

        async fn stream(
            &self,
            prompt: &str,
            cancel: &CancellationToken,
        ) -> AIServiceResult<TextStream> {
            let text = self.complete(prompt, cancel).await?;
            Ok(Box::pin(futures::stream::iter(vec![Ok(text)])))
        }
    }

    /// Echoes a fixed result for every execute request
    pub struct StubTransport;

    #[async_trait]
    impl SandboxTransport for StubTransport {
        async fn post_execute(
            &self,
            request: &WireExecuteRequest,
            _cancel: &CancellationToken,
        ) -> SandboxResult<SandboxExecuteResponse> {
            Ok(SandboxExecuteResponse {
                session_id: request.session_id.clone(),
                result: SANDBOX_RESULT.to_string(),
                output: String::new(),
                error: None,
                call_count: 0,
            })
        }

        async fn health(&self, _cancel: &CancellationToken) -> SandboxResult<HealthStatus> {
            Ok(HealthStatus {
                status: "healthy".to_string(),
                service: "rlm-sandbox".to_string(),
            })
        }
    }

    /// Tool context over stubs, with a caller-supplied sandbox transport
    pub fn context_with_transport(transport: Arc<dyn SandboxTransport>) -> ToolContext {
        let model: Arc<dyn ModelGateway> = Arc::new(StubModel);
        let sandbox = Arc::new(SandboxGateway::new(transport));
        let orchestrator = Arc::new(RecursiveOrchestrator::new(
            Arc::clone(&model),
            Arc::clone(&sandbox),
            OrchestratorConfig::default(),
        ));
        let explorer = Arc::new(ChunkExplorer::new(model));

        ToolContext::new(orchestrator, explorer, sandbox, CancellationToken::new())
    }

    pub fn create_test_context() -> ToolContext {
        context_with_transport(Arc::new(StubTransport))
    }
}
