// ABOUTME: Error types raised inside an orchestration chain
// ABOUTME: Classified into failure kinds so callers branch on data instead of faults

use rlm_ai::AIServiceError;
use rlm_sandbox::SandboxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model call failed: {0}")]
    Model(#[from] AIServiceError),

    #[error("Sandbox call failed: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Internal orchestrator error: {0}")]
    Internal(String),

    #[error("Execution cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Model(AIServiceError::Cancelled) => FailureKind::Cancelled,
            EngineError::Model(_) => FailureKind::Transport,
            EngineError::Sandbox(SandboxError::Validation(_)) => FailureKind::Validation,
            EngineError::Sandbox(SandboxError::Transport(_)) => FailureKind::Transport,
            EngineError::Sandbox(SandboxError::Cancelled) => FailureKind::Cancelled,
            EngineError::Internal(_) => FailureKind::Engine,
            EngineError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Category of a failed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A sandbox request was rejected before dispatch
    Validation,
    /// The model server or sandbox could not be reached or answered with a failure status
    Transport,
    /// The generated code raised inside the sandbox
    Application,
    /// A callback referenced a session that is not registered
    SessionNotFound,
    /// Unexpected fault, including panics
    Engine,
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_sandbox::ValidationError;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            EngineError::Model(AIServiceError::Cancelled).kind(),
            FailureKind::Cancelled
        );
        assert_eq!(
            EngineError::Model(AIServiceError::InvalidResponse).kind(),
            FailureKind::Transport
        );
        assert_eq!(
            EngineError::Sandbox(SandboxError::Validation(ValidationError {
                field: "code",
                reason: "must not be empty".to_string(),
            }))
            .kind(),
            FailureKind::Validation
        );
        assert_eq!(
            EngineError::Internal("boom".to_string()).kind(),
            FailureKind::Engine
        );
        assert_eq!(EngineError::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FailureKind::SessionNotFound).unwrap(),
            "\"session_not_found\""
        );
    }
}
