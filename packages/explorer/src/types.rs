// ABOUTME: Option and result types for chunk exploration
// ABOUTME: Defaults mirror the explorer section of the runtime configuration

use rlm_config::{ExplorerConfig, RlmConfig};
use rlm_core::TextChunk;
use serde::{Deserialize, Serialize};

/// What to do when a single chunk's summary call fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFailurePolicy {
    /// Abandon every in-flight sibling and report the failure
    #[default]
    Abort,
    /// Drop the failed chunk and continue with the rest
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreOptions {
    pub window_size: usize,
    pub overlap: usize,
    pub max_files: usize,
    pub max_chunks: usize,
    pub max_concurrent_requests: usize,
    pub failure_policy: ChunkFailurePolicy,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self::from_config(&RlmConfig::default().explorer)
    }
}

impl ExploreOptions {
    pub fn from_config(config: &ExplorerConfig) -> Self {
        Self {
            window_size: config.window_lines,
            overlap: config.overlap_lines,
            max_files: config.max_files,
            max_chunks: config.max_chunks,
            max_concurrent_requests: config.max_concurrent,
            failure_policy: ChunkFailurePolicy::default(),
        }
    }
}

/// A chunk judged relevant, with the secondary model's summary of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub chunk: TextChunk,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationResult {
    pub answer: String,
    /// Relevant chunks in source order
    pub relevant_chunks: Vec<ChunkSummary>,
    pub chunks_processed: usize,
    pub chunks_relevant: usize,
    /// Chunks dropped under [`ChunkFailurePolicy::Skip`]
    #[serde(default)]
    pub chunks_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExplorationResult {
    pub(crate) fn answered(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExploreOptions::default();
        assert_eq!(options.window_size, 200);
        assert_eq!(options.overlap, 20);
        assert_eq!(options.max_files, 20);
        assert_eq!(options.max_chunks, 100);
        assert_eq!(options.max_concurrent_requests, 4);
        assert_eq!(options.failure_policy, ChunkFailurePolicy::Abort);
    }
}
