// ABOUTME: Session state shared between an orchestration chain and its re-entrant callbacks
// ABOUTME: Concurrent registry with guard-based removal, atomic counters, and an append-only trace

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rlm_core::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One completed sandbox step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub depth: u32,
    pub prompt: String,
    pub code: String,
    pub result: String,
    pub call_count: u64,
    pub timestamp: DateTime<Utc>,
}

/// State of one top-level invocation
#[derive(Debug)]
pub struct Session {
    id: String,
    max_depth: u32,
    context: Context,
    depth_seen: AtomicU32,
    total_calls: AtomicU64,
    trace: Mutex<Vec<TraceEntry>>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(id: impl Into<String>, max_depth: u32, context: Context) -> Self {
        Self {
            id: id.into(),
            max_depth,
            context,
            depth_seen: AtomicU32::new(0),
            total_calls: AtomicU64::new(0),
            trace: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the session's lifetime token to `cancel`, usually a child of the caller's token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fires when the owning invocation is cancelled or the session is deregistered
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Context the invocation started with
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Raise the deepest-seen marker; never lowers it
    pub fn observe_depth(&self, depth: u32) {
        self.depth_seen.fetch_max(depth, Ordering::AcqRel);
    }

    pub fn depth_seen(&self) -> u32 {
        self.depth_seen.load(Ordering::Acquire)
    }

    pub fn add_calls(&self, count: u64) {
        self.total_calls.fetch_add(count, Ordering::AcqRel);
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Acquire)
    }

    pub async fn record(&self, entry: TraceEntry) {
        self.trace.lock().await.push(entry);
    }

    pub async fn trace(&self) -> Vec<TraceEntry> {
        self.trace.lock().await.clone()
    }
}

/// Registry of live sessions keyed by id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` until the returned guard is dropped
    pub fn register(self: &Arc<Self>, session: Arc<Session>) -> SessionGuard {
        let id = session.id().to_string();
        self.sessions.insert(id.clone(), session);
        info!("Registered session {} ({} active)", id, self.sessions.len());

        SessionGuard {
            store: Arc::clone(self),
            id,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            // Stops callbacks still running against the removed session
            session.cancel.cancel();
            debug!("Removed session {} ({} active)", id, self.sessions.len());
        }
    }
}

/// Removes and cancels its session when dropped, including on panic or cancellation
#[derive(Debug)]
pub struct SessionGuard {
    store: Arc<SessionStore>,
    id: String,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.store.remove(&self.id);
    }
}
