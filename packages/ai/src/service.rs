// ABOUTME: Model service for completion calls against a local OpenAI-compatible server
// ABOUTME: Handles chat completion requests, SSE streaming, cancellation, and error mapping

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use rlm_config::ModelConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::gateway::{ModelGateway, TextStream};

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum AIServiceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid response format")]
    InvalidResponse,

    #[error("Model request cancelled")]
    Cancelled,
}

pub type AIServiceResult<T> = Result<T, AIServiceError>;

/// Settings for one model endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelServiceConfig {
    /// Base URL including the API prefix, e.g. `http://127.0.0.1:1234/v1`
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl ModelServiceConfig {
    /// Settings for the primary (code-generating) model
    pub fn primary(config: &ModelConfig) -> Self {
        Self::with_model(config, config.model.clone())
    }

    /// Settings for the secondary model used to summarize chunks
    pub fn explorer(config: &ModelConfig) -> Self {
        Self::with_model(config, config.explorer_model.clone())
    }

    fn with_model(config: &ModelConfig, model: String) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model,
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// One parsed line of a server-sent event stream
#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Done,
    Error(String),
    Skip,
}

/// Completion client for a local model server (LM Studio, llama.cpp, Ollama, vLLM)
pub struct LocalModelService {
    client: Client,
    config: ModelServiceConfig,
}

impl LocalModelService {
    /// Create HTTP client with timeout configuration
    fn create_client(timeout_secs: u64) -> AIServiceResult<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?)
    }

    pub fn new(config: ModelServiceConfig) -> AIServiceResult<Self> {
        info!(
            "Using local model '{}' at {} (timeout={}s)",
            config.model, config.base_url, config.timeout_secs
        );

        Ok(Self {
            client: Self::create_client(config.timeout_secs)?,
            config,
        })
    }

    /// Get the model being used by this service
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
        stream: bool,
    ) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: DEFAULT_TEMPERATURE,
            stream: stream.then_some(true),
        }
    }

    /// POST the request and reject non-success statuses
    async fn send(&self, request: &ChatCompletionRequest) -> AIServiceResult<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .json(request);

        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                error!(
                    "Model request timed out after {} seconds",
                    self.config.timeout_secs
                );
                AIServiceError::ApiError(format!(
                    "Request timed out after {} seconds",
                    self.config.timeout_secs
                ))
            } else if e.is_connect() {
                error!("Failed to connect to model server: {}", e);
                AIServiceError::ApiError(format!(
                    "Connection failed: {}. Is the model server running at {}?",
                    e, self.config.base_url
                ))
            } else {
                error!("Model request failed: {}", e);
                AIServiceError::RequestFailed(e)
            }
        })?;

        debug!("Received response from model server: status={}", response.status());

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Model server error: {} - {}", status, error_text);
            return Err(AIServiceError::ApiError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    /// Makes a text generation call
    pub async fn generate_text(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> AIServiceResult<String> {
        let request = self.build_request(system_prompt, prompt, false);

        info!(
            "Making model text generation request: model={}, prompt_chars={}",
            request.model,
            prompt.len()
        );

        let response = self.send(&request).await?;
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AIServiceError::ParseError(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AIServiceError::InvalidResponse)
    }

    /// Makes a streaming text generation call.
    /// Returns a stream of text fragments as they arrive.
    pub async fn generate_text_stream(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> AIServiceResult<TextStream> {
        let request = self.build_request(None, prompt, true);

        info!(
            "Making model streaming text generation request: model={}",
            request.model
        );

        let response = self.send(&request).await?;

        let stream = async_stream::stream! {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    chunk = byte_stream.next() => Some(chunk),
                };

                let bytes = match next {
                    None => {
                        yield Err(AIServiceError::Cancelled);
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Err(e))) => {
                        yield Err(AIServiceError::RequestFailed(e));
                        return;
                    }
                    Some(Some(Ok(bytes))) => bytes,
                };

                for line in lines.push(&bytes) {
                    match parse_sse_line(&line) {
                        SseLine::Fragment(text) => yield Ok(text),
                        SseLine::Done => return,
                        SseLine::Error(message) => {
                            yield Err(AIServiceError::ApiError(message));
                            return;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            // Servers may omit the final newline
            if let Some(line) = lines.finish() {
                if let SseLine::Fragment(text) = parse_sse_line(&line) {
                    yield Ok(text);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ModelGateway for LocalModelService {
    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> AIServiceResult<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AIServiceError::Cancelled),
            result = self.generate_text(None, prompt) => result,
        }
    }

    async fn complete_with_system(
        &self,
        system_prompt: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> AIServiceResult<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AIServiceError::Cancelled),
            result = self.generate_text(Some(system_prompt), prompt) => result,
        }
    }

    async fn stream(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> AIServiceResult<TextStream> {
        let token = cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AIServiceError::Cancelled),
            result = self.generate_text_stream(prompt, token) => result,
        }
    }
}

/// Splits a byte stream into lines, decoding only once a line is complete so
/// multi-byte characters split across network chunks survive
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line_end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            lines.push(String::from_utf8_lossy(&line[..line_end]).into_owned());
        }
        lines
    }

    /// Remaining bytes that never saw a newline
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseLine::Skip;
    };

    if let Some(message) = event["error"]["message"].as_str() {
        return SseLine::Error(message.to_string());
    }

    match event["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => SseLine::Fragment(text.to_string()),
        _ => SseLine::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_fragment() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Fragment("Hel".to_string()));
    }

    #[test]
    fn test_parse_sse_done_and_noise() {
        assert_eq!(parse_sse_line("data: [DONE]\r"), SseLine::Done);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
    }

    #[test]
    fn test_parse_sse_error() {
        let line = r#"data: {"error":{"message":"model not loaded"}}"#;
        assert_eq!(
            parse_sse_line(line),
            SseLine::Error("model not loaded".to_string())
        );
    }

    #[test]
    fn test_line_buffer_keeps_split_multibyte_characters() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n".as_bytes();
        // Split between the two bytes of 'é'
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(&line[..split]).is_empty());
        let lines = buffer.push(&line[split..]);

        assert_eq!(lines.len(), 1);
        assert_eq!(
            parse_sse_line(&lines[0]),
            SseLine::Fragment("café".to_string())
        );
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_line_buffer_returns_unterminated_tail() {
        let mut buffer = SseLineBuffer::default();
        let lines = buffer.push(b"data: one\r\ndata: t");
        assert_eq!(lines, vec!["data: one\r".to_string()]);
        assert!(buffer.push("wö".as_bytes()).is_empty());
        assert_eq!(buffer.finish(), Some("data: twö".to_string()));
    }

    #[test]
    fn test_request_includes_system_message_first() {
        let service = LocalModelService::new(ModelServiceConfig {
            base_url: "http://127.0.0.1:1234/v1/".to_string(),
            model: "local-model".to_string(),
            api_key: None,
            timeout_secs: 5,
            max_tokens: 128,
        })
        .unwrap();

        let request = service.build_request(Some("be terse"), "hi", false);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "hi");
        assert_eq!(request.stream, None);
        assert_eq!(
            service.endpoint(),
            "http://127.0.0.1:1234/v1/chat/completions"
        );
    }
}
