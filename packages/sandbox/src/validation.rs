// ABOUTME: Security policy applied to every sandbox request before dispatch
// ABOUTME: Bounds identifiers, code and context sizes, recursion depth, and callback targets

use std::fmt;

use thiserror::Error;
use url::{Host, Url};

use crate::types::SandboxExecuteRequest;

pub const MAX_SESSION_ID_LENGTH: usize = 128;
pub const MAX_CODE_LENGTH: usize = 100_000;
pub const MAX_CONTEXT_KEY_LENGTH: usize = 256;
pub const MAX_CONTEXT_TOTAL_SIZE: usize = 10_000_000;
pub const MIN_MAX_DEPTH: i32 = 1;
pub const MAX_MAX_DEPTH: i32 = 10;

/// A request field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Limits enforced on outbound sandbox requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub max_session_id_length: usize,
    pub max_code_length: usize,
    pub max_context_key_length: usize,
    pub max_context_total_size: usize,
    pub min_max_depth: i32,
    pub max_max_depth: i32,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            max_session_id_length: MAX_SESSION_ID_LENGTH,
            max_code_length: MAX_CODE_LENGTH,
            max_context_key_length: MAX_CONTEXT_KEY_LENGTH,
            max_context_total_size: MAX_CONTEXT_TOTAL_SIZE,
            min_max_depth: MIN_MAX_DEPTH,
            max_max_depth: MAX_MAX_DEPTH,
        }
    }
}

impl SandboxPolicy {
    /// Check `request`, reporting the first violation found
    pub fn validate(&self, request: &SandboxExecuteRequest) -> Result<(), ValidationError> {
        self.validate_session_id(&request.session_id)?;
        self.validate_code(&request.code)?;
        self.validate_context(&request.context)?;
        self.validate_depth(request.depth, request.max_depth)?;

        if let Some(callback_url) = request.effective_callback_url() {
            validate_callback_url(callback_url)?;
        }

        Ok(())
    }

    fn validate_session_id(&self, session_id: &str) -> Result<(), ValidationError> {
        if session_id.is_empty() {
            return Err(ValidationError::new("session_id", "must not be empty"));
        }

        let length = session_id.chars().count();
        if length > self.max_session_id_length {
            return Err(ValidationError::new(
                "session_id",
                format!(
                    "length {} exceeds maximum of {}",
                    length, self.max_session_id_length
                ),
            ));
        }

        if let Some(bad) = session_id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ValidationError::new(
                "session_id",
                format!("contains disallowed character {:?}", bad),
            ));
        }

        Ok(())
    }

    fn validate_code(&self, code: &str) -> Result<(), ValidationError> {
        if code.trim().is_empty() {
            return Err(ValidationError::new("code", "must not be empty"));
        }

        let length = code.chars().count();
        if length > self.max_code_length {
            return Err(ValidationError::new(
                "code",
                format!(
                    "length {} exceeds maximum of {}",
                    length, self.max_code_length
                ),
            ));
        }

        Ok(())
    }

    fn validate_context(&self, context: &rlm_core::Context) -> Result<(), ValidationError> {
        let mut total = 0usize;

        for (key, value) in context {
            let key_length = key.chars().count();
            if key_length > self.max_context_key_length {
                return Err(ValidationError::new(
                    "context",
                    format!(
                        "key length {} exceeds maximum of {}",
                        key_length, self.max_context_key_length
                    ),
                ));
            }

            if key.contains("..") || key.contains('~') {
                return Err(ValidationError::new(
                    "context",
                    format!("key {:?} contains a path traversal sequence", key),
                ));
            }

            total = total.saturating_add(key_length + value.chars().count());
            if total > self.max_context_total_size {
                return Err(ValidationError::new(
                    "context",
                    format!(
                        "total size exceeds maximum of {} characters",
                        self.max_context_total_size
                    ),
                ));
            }
        }

        Ok(())
    }

    fn validate_depth(&self, depth: i32, max_depth: i32) -> Result<(), ValidationError> {
        if depth < 0 {
            return Err(ValidationError::new("depth", "must not be negative"));
        }

        if max_depth < self.min_max_depth || max_depth > self.max_max_depth {
            return Err(ValidationError::new(
                "max_depth",
                format!(
                    "{} is outside {}..={}",
                    max_depth, self.min_max_depth, self.max_max_depth
                ),
            ));
        }

        if depth > max_depth {
            return Err(ValidationError::new(
                "depth",
                format!("{} exceeds max_depth {}", depth, max_depth),
            ));
        }

        Ok(())
    }
}

/// Callbacks may only target the local machine
fn validate_callback_url(callback_url: &str) -> Result<(), ValidationError> {
    let url = Url::parse(callback_url)
        .map_err(|e| ValidationError::new("callback_url", format!("not an absolute URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::new(
            "callback_url",
            format!("scheme {:?} is not http or https", url.scheme()),
        ));
    }

    let is_loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    if !is_loopback {
        return Err(ValidationError::new(
            "callback_url",
            format!(
                "host {:?} is not a loopback address",
                url.host_str().unwrap_or_default()
            ),
        ));
    }

    Ok(())
}
