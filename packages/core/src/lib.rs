// ABOUTME: Core types, traits, and utilities for the RLM engine
// ABOUTME: Foundational package providing chunking, code extraction, and shared helpers

pub mod chunker;
pub mod extractor;
pub mod types;
pub mod utils;

// Re-export main types
pub use types::Context;

// Re-export chunking
pub use chunker::{Chunker, ChunkerError, LineWindows, TextChunk};

// Re-export extraction
pub use extractor::extract_code;

// Re-export utilities
pub use utils::{generate_session_id, truncate};
