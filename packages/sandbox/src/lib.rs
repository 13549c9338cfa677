// ABOUTME: Sandbox gateway package for dispatching generated code to the external executor
// ABOUTME: Validates outbound requests against a security policy before any network I/O

pub mod error;
pub mod gateway;
pub mod transport;
pub mod types;
pub mod validation;

pub use error::{Result, SandboxError};
pub use gateway::SandboxGateway;
pub use transport::{HttpSandboxTransport, SandboxTransport};
pub use types::{
    HealthStatus, RecursiveCallRequest, RecursiveCallResponse, SandboxExecuteRequest,
    SandboxExecuteResponse, WireExecuteRequest,
};
pub use validation::{SandboxPolicy, ValidationError};
