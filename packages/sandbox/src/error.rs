// ABOUTME: Error types for sandbox gateway operations
// ABOUTME: Separates policy rejections from transport failures and cancellation

use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Sandbox transport error: {0}")]
    Transport(String),

    #[error("Sandbox request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SandboxError {
    fn from(err: reqwest::Error) -> Self {
        SandboxError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
