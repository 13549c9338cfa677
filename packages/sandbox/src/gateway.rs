// ABOUTME: Sandbox gateway combining the validation policy with a transport
// ABOUTME: Rejected requests never reach the network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::Result;
use crate::transport::SandboxTransport;
use crate::types::{HealthStatus, SandboxExecuteRequest, SandboxExecuteResponse, WireExecuteRequest};
use crate::validation::SandboxPolicy;

pub struct SandboxGateway {
    policy: SandboxPolicy,
    transport: Arc<dyn SandboxTransport>,
}

impl SandboxGateway {
    pub fn new(transport: Arc<dyn SandboxTransport>) -> Self {
        Self::with_policy(SandboxPolicy::default(), transport)
    }

    pub fn with_policy(policy: SandboxPolicy, transport: Arc<dyn SandboxTransport>) -> Self {
        Self { policy, transport }
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    /// Validate `request` and forward it to the sandbox.
    ///
    /// An application-level failure inside the sandbox is reported through
    /// `SandboxExecuteResponse::error`, not as an `Err`.
    pub async fn execute(
        &self,
        request: &SandboxExecuteRequest,
        cancel: &CancellationToken,
    ) -> Result<SandboxExecuteResponse> {
        if let Err(err) = self.policy.validate(request) {
            warn!(
                "Rejected sandbox request for session {:?}: {}",
                request.session_id, err
            );
            return Err(err.into());
        }

        let wire = WireExecuteRequest::from(request);
        self.transport.post_execute(&wire, cancel).await
    }

    pub async fn health(&self, cancel: &CancellationToken) -> Result<HealthStatus> {
        self.transport.health(cancel).await
    }
}
