// ABOUTME: Shared data types used across RLM packages
// ABOUTME: Context maps passed between the orchestrator, sandbox, and callbacks

use std::collections::BTreeMap;

/// Named pieces of text (files, documents, notes) handed to a sub-task.
///
/// Ordered so that prompt rendering and wire payloads are deterministic.
pub type Context = BTreeMap<String, String>;
