// ABOUTME: Prompt templates for per-chunk relevance summaries and final aggregation
// ABOUTME: The relevance sentinel lets the secondary model discard chunks cheaply

use rlm_core::TextChunk;

use crate::types::ChunkSummary;

/// Marker the secondary model emits for chunks that do not bear on the query
pub const NOT_RELEVANT: &str = "NOT_RELEVANT";

pub const CHUNK_SYSTEM_PROMPT: &str = r#"You are a precise code and document analyst.

You read one excerpt of a larger corpus at a time and report only what in that excerpt helps answer the user's question.
Quote identifiers, names, and numbers exactly as they appear.
If the excerpt contains nothing useful for the question, reply with exactly NOT_RELEVANT and nothing else."#;

pub const AGGREGATION_SYSTEM_PROMPT: &str = r#"You are a senior analyst combining findings from many excerpts of a corpus.

Answer the user's question using only the findings provided.
Cite the bracketed locations of the findings you rely on.
If the findings disagree or leave gaps, say so plainly."#;

/// Ask for a relevance-filtered summary of `chunk`
pub fn chunk_summary_prompt(query: &str, chunk: &TextChunk) -> String {
    format!(
        r#"Question: {}

Excerpt from {} (lines {}-{}):
---
{}
---

Summarize what this excerpt contributes to answering the question. Reply with exactly {} if it contributes nothing."#,
        query,
        chunk.source.as_deref().unwrap_or("<inline>"),
        chunk.start_line + 1,
        chunk.end_line,
        chunk.content,
        NOT_RELEVANT
    )
}

/// Combine every relevant summary, in source order, into one final question
pub fn aggregation_prompt(query: &str, summaries: &[ChunkSummary]) -> String {
    let findings = summaries
        .iter()
        .map(|entry| format!("[{}]\n{}", entry.chunk.location(), entry.summary.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Question: {}\n\nFindings from {} relevant excerpts:\n\n{}\n\nWrite the final answer to the question.",
        query,
        summaries.len(),
        findings
    )
}

/// Whether a chunk summary marks its chunk as irrelevant
pub fn is_not_relevant(summary: &str) -> bool {
    summary.to_ascii_uppercase().contains(NOT_RELEVANT)
}
