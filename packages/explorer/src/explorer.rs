// ABOUTME: Bounded-parallel map-reduce over file chunks using the secondary model
// ABOUTME: Summarizes chunks under a semaphore, filters irrelevant ones, and aggregates in source order

use std::path::Path;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use rlm_ai::{AIServiceError, AIServiceResult, ModelGateway};
use rlm_core::{Chunker, TextChunk};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::prompts::{
    aggregation_prompt, chunk_summary_prompt, is_not_relevant, AGGREGATION_SYSTEM_PROMPT,
    CHUNK_SYSTEM_PROMPT,
};
use crate::types::{ChunkFailurePolicy, ChunkSummary, ExplorationResult, ExploreOptions};

pub const NO_CONTENT_ANSWER: &str = "No content found in the specified files.";
pub const NO_RELEVANT_ANSWER: &str = "No relevant sections found for the query.";

pub struct ChunkExplorer {
    model: Arc<dyn ModelGateway>,
    defaults: ExploreOptions,
}

impl ChunkExplorer {
    pub fn new(model: Arc<dyn ModelGateway>) -> Self {
        Self::with_defaults(model, ExploreOptions::default())
    }

    pub fn with_defaults(model: Arc<dyn ModelGateway>, defaults: ExploreOptions) -> Self {
        Self { model, defaults }
    }

    /// Options used when a caller does not override them
    pub fn defaults(&self) -> &ExploreOptions {
        &self.defaults
    }

    /// Answer `query` over the given files.
    ///
    /// Never fails: invalid options, model errors, and cancellation are reported
    /// through [`ExplorationResult::error`].
    pub async fn explore<P: AsRef<Path>>(
        &self,
        query: &str,
        file_paths: &[P],
        options: &ExploreOptions,
        cancel: &CancellationToken,
    ) -> ExplorationResult {
        let chunker = match Chunker::new(options.window_size, options.overlap) {
            Ok(chunker) => chunker,
            Err(err) => {
                warn!("Rejected exploration options: {}", err);
                return ExplorationResult::failed(format!("Invalid exploration options: {}", err));
            }
        };

        let mut chunks = Vec::new();
        for (source, content) in load_sources(file_paths, options.max_files).await {
            chunks.extend(chunker.chunk(&content, Some(&source)));
            if chunks.len() >= options.max_chunks {
                break;
            }
        }
        chunks.truncate(options.max_chunks);

        if chunks.is_empty() {
            info!("No content to explore for query");
            return ExplorationResult::answered(NO_CONTENT_ANSWER);
        }

        info!(
            "Exploring {} chunks with up to {} concurrent requests",
            chunks.len(),
            options.max_concurrent_requests.max(1)
        );

        let (summaries, skipped) = match self
            .summarize_chunks(query, &chunks, options, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Chunk analysis failed: {}", err);
                return ExplorationResult::failed(format!("Chunk analysis failed: {}", err));
            }
        };

        let chunks_processed = chunks.len() - skipped;
        let relevant_chunks: Vec<ChunkSummary> = chunks
            .into_iter()
            .zip(summaries)
            .filter_map(|(chunk, summary)| {
                let summary = summary?;
                if is_not_relevant(&summary) {
                    None
                } else {
                    Some(ChunkSummary { chunk, summary })
                }
            })
            .collect();

        debug!(
            "{} of {} processed chunks are relevant",
            relevant_chunks.len(),
            chunks_processed
        );

        let mut result = ExplorationResult {
            answer: String::new(),
            chunks_processed,
            chunks_relevant: relevant_chunks.len(),
            chunks_skipped: skipped,
            relevant_chunks: Vec::new(),
            error: None,
        };

        if result.chunks_relevant == 0 {
            result.answer = NO_RELEVANT_ANSWER.to_string();
            return result;
        }

        let prompt = aggregation_prompt(query, &relevant_chunks);
        result.relevant_chunks = relevant_chunks;

        match self
            .model
            .complete_with_system(AGGREGATION_SYSTEM_PROMPT, &prompt, cancel)
            .await
        {
            Ok(answer) => result.answer = answer,
            Err(err) => {
                error!("Aggregation call failed: {}", err);
                result.error = Some(format!("Aggregation failed: {}", err));
            }
        }

        result
    }

    /// Summarize every chunk, returning summaries aligned with `chunks` and the number skipped
    async fn summarize_chunks(
        &self,
        query: &str,
        chunks: &[TextChunk],
        options: &ExploreOptions,
        cancel: &CancellationToken,
    ) -> AIServiceResult<(Vec<Option<String>>, usize)> {
        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_requests.max(1)));

        let calls = chunks.iter().map(|chunk| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return Err(AIServiceError::Cancelled);
                };
                let prompt = chunk_summary_prompt(query, chunk);
                self.model
                    .complete_with_system(CHUNK_SYSTEM_PROMPT, &prompt, cancel)
                    .await
            }
        });

        match options.failure_policy {
            ChunkFailurePolicy::Abort => {
                let summaries = try_join_all(calls).await?;
                Ok((summaries.into_iter().map(Some).collect(), 0))
            }
            ChunkFailurePolicy::Skip => {
                let results = join_all(calls).await;
                if cancel.is_cancelled() {
                    return Err(AIServiceError::Cancelled);
                }

                let mut skipped = 0;
                let summaries = results
                    .into_iter()
                    .zip(chunks)
                    .map(|(result, chunk)| match result {
                        Ok(summary) => Some(summary),
                        Err(err) => {
                            warn!("Skipping chunk {}: {}", chunk.location(), err);
                            skipped += 1;
                            None
                        }
                    })
                    .collect();
                Ok((summaries, skipped))
            }
        }
    }
}

/// Read up to `max_files` readable files in order; unreadable paths do not count
async fn load_sources<P: AsRef<Path>>(file_paths: &[P], max_files: usize) -> Vec<(String, String)> {
    let mut sources = Vec::new();

    for path in file_paths {
        if sources.len() >= max_files {
            break;
        }

        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => sources.push((path.display().to_string(), content)),
            Err(err) => warn!("Skipping unreadable file {}: {}", path.display(), err),
        }
    }

    sources
}
