// ABOUTME: Transport seam between the sandbox gateway and the external executor process
// ABOUTME: HTTP implementation posts execute requests and probes the health endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rlm_config::SandboxConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Result, SandboxError};
use crate::types::{HealthStatus, SandboxExecuteResponse, WireExecuteRequest};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Delivers already-validated requests to a sandbox
#[async_trait]
pub trait SandboxTransport: Send + Sync {
    async fn post_execute(
        &self,
        request: &WireExecuteRequest,
        cancel: &CancellationToken,
    ) -> Result<SandboxExecuteResponse>;

    async fn health(&self, cancel: &CancellationToken) -> Result<HealthStatus>;
}

pub struct HttpSandboxTransport {
    client: Client,
    base_url: String,
}

impl HttpSandboxTransport {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SandboxConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_execute(&self, request: &WireExecuteRequest) -> Result<SandboxExecuteResponse> {
        let url = format!("{}/execute", self.base_url);
        info!(
            "Dispatching code to sandbox: session={}, depth={}/{}, code_chars={}",
            request.session_id,
            request.depth,
            request.max_depth,
            request.code.len()
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Sandbox request to {} failed: {}", url, e);
                SandboxError::Transport(format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Sandbox returned {}: {}", status, body);
            return Err(SandboxError::Transport(format!(
                "sandbox returned {}: {}",
                status, body
            )));
        }

        let decoded: SandboxExecuteResponse = response.json().await.map_err(|e| {
            SandboxError::Transport(format!("invalid sandbox response: {}", e))
        })?;

        debug!(
            "Sandbox execution finished: session={}, call_count={}, error={}",
            decoded.session_id,
            decoded.call_count,
            decoded.error.is_some()
        );

        Ok(decoded)
    }

    async fn send_health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| SandboxError::Transport(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SandboxError::Transport(format!(
                "sandbox health check returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SandboxError::Transport(format!("invalid health response: {}", e)))
    }
}

#[async_trait]
impl SandboxTransport for HttpSandboxTransport {
    async fn post_execute(
        &self,
        request: &WireExecuteRequest,
        cancel: &CancellationToken,
    ) -> Result<SandboxExecuteResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SandboxError::Cancelled),
            result = self.send_execute(request) => result,
        }
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<HealthStatus> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SandboxError::Cancelled),
            result = self.send_health() => result,
        }
    }
}
