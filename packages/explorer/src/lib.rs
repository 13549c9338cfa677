// ABOUTME: Chunk explorer package for analysing corpora too large for one prompt
// ABOUTME: Windows files into chunks, summarizes them in parallel, and aggregates the relevant ones

pub mod explorer;
pub mod prompts;
pub mod types;

pub use explorer::{ChunkExplorer, NO_CONTENT_ANSWER, NO_RELEVANT_ANSWER};
pub use types::{ChunkFailurePolicy, ChunkSummary, ExplorationResult, ExploreOptions};
