// ABOUTME: Recursive orchestrator package for the RLM engine
// ABOUTME: Runs depth-bounded generate/execute cycles and services re-entrant sandbox callbacks

pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod session;

pub use error::{EngineError, FailureKind, Result};
pub use orchestrator::{
    ExecutionResult, OrchestratorConfig, RecursiveOrchestrator, RECURSIVE_CALL_FAILED_PREFIX,
    SESSION_NOT_FOUND,
};
pub use session::{Session, SessionGuard, SessionStore, TraceEntry};
