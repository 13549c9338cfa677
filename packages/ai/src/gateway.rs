// ABOUTME: Model gateway trait consumed by the orchestrator and chunk explorer
// ABOUTME: Completion, system-prompted completion, and cancellable streaming contracts

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::service::AIServiceResult;

/// Finite, single-consumer sequence of text fragments. Not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = AIServiceResult<String>> + Send>>;

/// Language-model completion interface
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Complete a single user prompt
    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> AIServiceResult<String>;

    /// Complete a user prompt under a system prompt
    async fn complete_with_system(
        &self,
        system_prompt: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> AIServiceResult<String>;

    /// Stream the completion of a prompt fragment by fragment.
    ///
    /// The stream ends early, yielding `AIServiceError::Cancelled`, once
    /// `cancel` fires.
    async fn stream(&self, prompt: &str, cancel: &CancellationToken)
        -> AIServiceResult<TextStream>;
}
