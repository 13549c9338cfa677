// ABOUTME: Depth-bounded recursive orchestrator driving model code generation and sandbox execution
// ABOUTME: Owns the session registry and converts every failure into a structured result

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use rlm_ai::ModelGateway;
use rlm_core::{extract_code, generate_session_id, Context};
use rlm_sandbox::{SandboxExecuteRequest, SandboxGateway};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, FailureKind, Result};
use crate::prompts::{
    code_generation_prompt, direct_answer_prompt, DEPTH_EXHAUSTED_CONTEXT_BUDGET,
    EXTRACTION_FALLBACK_CONTEXT_BUDGET,
};
use crate::session::{Session, SessionStore, TraceEntry};

/// Returned to a callback that names an unknown or finished session
pub const SESSION_NOT_FOUND: &str = "[ERROR: Session not found or expired]";

/// Prefix of the text returned when a recursive call fails
pub const RECURSIVE_CALL_FAILED_PREFIX: &str = "[ERROR: Recursive call failed - ";

const EXECUTION_ERROR_PREFIX: &str = "[EXECUTION ERROR]";
const DEFAULT_MAX_DEPTH: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Base URL the sandbox calls back for `rlm_call`; `None` disables recursion
    pub callback_url: Option<String>,
    pub default_max_depth: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            callback_url: None,
            default_max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Outcome of one top-level invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub answer: String,
    /// Deepest recursion level any step of the invocation reached
    pub max_depth_reached: u32,
    /// Recursive calls reported by the sandbox across all steps
    pub total_calls: u64,
    pub trace: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

struct StepOutput {
    answer: String,
    application_error: Option<String>,
}

impl StepOutput {
    fn answer(answer: String) -> Self {
        Self {
            answer,
            application_error: None,
        }
    }
}

pub struct RecursiveOrchestrator {
    model: Arc<dyn ModelGateway>,
    sandbox: Arc<SandboxGateway>,
    sessions: Arc<SessionStore>,
    config: OrchestratorConfig,
}

impl RecursiveOrchestrator {
    pub fn new(
        model: Arc<dyn ModelGateway>,
        sandbox: Arc<SandboxGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            model,
            sandbox,
            sessions: Arc::new(SessionStore::new()),
            config,
        }
    }

    /// Use an externally owned session registry
    pub fn with_session_store(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answer `query` over `context`, recursing through the sandbox up to `max_depth`.
    ///
    /// Never fails: errors and panics are reported in the returned result together
    /// with the trace accumulated before the failure.
    pub async fn execute(
        &self,
        query: &str,
        context: Context,
        max_depth: Option<u32>,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let max_depth = max_depth.unwrap_or(self.config.default_max_depth);
        let session = Arc::new(
            Session::new(generate_session_id(), max_depth, context)
                .with_cancellation(cancel.child_token()),
        );
        let guard = self.sessions.register(Arc::clone(&session));
        let session_cancel = session.cancellation_token().clone();

        info!(
            "Starting RLM execution: session={}, max_depth={}, context_keys={}",
            session.id(),
            max_depth,
            session.context().len()
        );

        let outcome = AssertUnwindSafe(self.run_step(
            &session,
            query,
            session.context(),
            0,
            &session_cancel,
        ))
        .catch_unwind()
        .await;

        let mut result = ExecutionResult {
            answer: String::new(),
            max_depth_reached: session.depth_seen(),
            total_calls: session.total_calls(),
            trace: session.trace().await,
            error: None,
            error_kind: None,
        };
        drop(guard);

        match outcome {
            Ok(Ok(step)) => {
                result.answer = step.answer;
                if let Some(message) = step.application_error {
                    result.error = Some(message);
                    result.error_kind = Some(FailureKind::Application);
                }
            }
            Ok(Err(err)) => {
                error!("RLM execution failed for session {}: {}", session.id(), err);
                result.error = Some(err.to_string());
                result.error_kind = Some(err.kind());
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("RLM execution panicked for session {}: {}", session.id(), message);
                result.error = Some(format!("Orchestrator panicked: {}", message));
                result.error_kind = Some(FailureKind::Engine);
            }
        }

        info!(
            "Finished RLM execution: session={}, depth_reached={}, total_calls={}, trace_entries={}, success={}",
            session.id(),
            result.max_depth_reached,
            result.total_calls,
            result.trace.len(),
            result.is_success()
        );

        result
    }

    /// Run one generate/execute step for `session` at `depth`.
    ///
    /// At or beyond the session's max depth the model answers directly from the
    /// context and no code is dispatched.
    pub async fn execute_at_depth(
        &self,
        session: &Session,
        query: &str,
        context: &Context,
        depth: u32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.run_step(session, query, context, depth, cancel)
            .await
            .map(|step| step.answer)
    }

    /// Re-entry point for `rlm_call` issued by sandboxed code.
    ///
    /// Always returns text: an unknown session yields [`SESSION_NOT_FOUND`] and a
    /// failure yields a message starting with [`RECURSIVE_CALL_FAILED_PREFIX`].
    pub async fn handle_recursive_call(
        &self,
        session_id: &str,
        prompt: &str,
        context: Context,
        depth: u32,
        cancel: &CancellationToken,
    ) -> String {
        let Some(session) = self.sessions.get(session_id) else {
            warn!("Recursive call for unknown session {:?}", session_id);
            return SESSION_NOT_FOUND.to_string();
        };

        debug!(
            "Recursive call: session={}, depth={}, context_keys={}",
            session_id,
            depth,
            context.len()
        );

        // Runs until the session ends or the callback itself is cancelled
        let call_cancel = session.cancellation_token().child_token();
        let step = AssertUnwindSafe(self.execute_at_depth(
            &session,
            prompt,
            &context,
            depth,
            &call_cancel,
        ))
        .catch_unwind();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                call_cancel.cancel();
                Ok(Err(EngineError::Cancelled))
            }
            outcome = step => outcome,
        };

        match outcome {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => {
                error!("Recursive call failed for session {}: {}", session_id, err);
                format!("{}{}]", RECURSIVE_CALL_FAILED_PREFIX, err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Recursive call panicked for session {}: {}", session_id, message);
                format!("{}{}]", RECURSIVE_CALL_FAILED_PREFIX, message)
            }
        }
    }

    async fn run_step(
        &self,
        session: &Session,
        query: &str,
        context: &Context,
        depth: u32,
        cancel: &CancellationToken,
    ) -> Result<StepOutput> {
        session.observe_depth(depth);

        if depth >= session.max_depth() {
            debug!(
                "Depth {} reached max {} for session {}; answering directly",
                depth,
                session.max_depth(),
                session.id()
            );
            return self
                .direct_answer(query, context, DEPTH_EXHAUSTED_CONTEXT_BUDGET, cancel)
                .await
                .map(StepOutput::answer);
        }

        let prompt = code_generation_prompt(query, context, depth, session.max_depth());
        let response = self.model.complete(&prompt, cancel).await?;

        let Some(code) = extract_code(&response) else {
            warn!(
                "No executable code in model response at depth {} for session {}; answering directly",
                depth,
                session.id()
            );
            return self
                .direct_answer(query, context, EXTRACTION_FALLBACK_CONTEXT_BUDGET, cancel)
                .await
                .map(StepOutput::answer);
        };

        let request = SandboxExecuteRequest {
            session_id: session.id().to_string(),
            code: code.clone(),
            context: context.clone(),
            callback_url: self.config.callback_url.clone(),
            depth: to_wire_depth(depth),
            max_depth: to_wire_depth(session.max_depth()),
        };

        let response = self.sandbox.execute(&request, cancel).await?;
        let call_count = response.call_count;
        session.add_calls(call_count);

        let (answer, application_error) = match response.error {
            Some(err) => {
                warn!(
                    "Sandbox code failed at depth {} for session {}: {}",
                    depth,
                    session.id(),
                    err
                );
                (format!("{} {}", EXECUTION_ERROR_PREFIX, err), Some(err))
            }
            None => (response.result, None),
        };

        session
            .record(TraceEntry {
                depth,
                prompt: query.to_string(),
                code,
                result: answer.clone(),
                call_count,
                timestamp: Utc::now(),
            })
            .await;

        Ok(StepOutput {
            answer,
            application_error,
        })
    }

    async fn direct_answer(
        &self,
        query: &str,
        context: &Context,
        budget: usize,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt = direct_answer_prompt(query, context, budget);
        Ok(self.model.complete(&prompt, cancel).await?)
    }
}

fn to_wire_depth(depth: u32) -> i32 {
    i32::try_from(depth).unwrap_or(i32::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
