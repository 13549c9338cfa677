// ABOUTME: Prompt templates for code generation and direct answers
// ABOUTME: Renders context maps into size-bounded text for the model

use rlm_core::{truncate, Context};

/// Context budget once the recursion depth is exhausted
pub const DEPTH_EXHAUSTED_CONTEXT_BUDGET: usize = 50_000;

/// Context budget when the model produced no executable code
pub const EXTRACTION_FALLBACK_CONTEXT_BUDGET: usize = 100_000;

/// Opening line of every direct-answer prompt
pub const DIRECT_ANSWER_HEADER: &str = "Answer the question directly using the provided context.";

/// Build the prompt asking the model for a Python program that answers `query`
pub fn code_generation_prompt(query: &str, context: &Context, depth: u32, max_depth: u32) -> String {
    let keys = if context.is_empty() {
        "(no context provided)".to_string()
    } else {
        context
            .iter()
            .map(|(key, value)| format!("- {} ({} chars)", key, value.chars().count()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are a Recursive Language Model. Instead of reading the whole context at once, you write Python code that inspects it and delegates focused sub-questions to yourself.

Recursion depth: {} of {}

Available context keys:
{}

Your code runs in a sandbox with these primitives:
- `context`: dict mapping each key above to its text
- `get_context(key)`: return the text stored under `key`
- `list_context_keys()`: return the list of keys
- `search_context(pattern)`: return the entries whose key or text contains `pattern` (case-insensitive)
- `rlm_call(prompt, subset)`: ask a recursive sub-model `prompt` over the dict `subset` (defaults to the full context) and return its answer as a string

Rules:
1. Assign the final answer, as a string, to the variable `result`.
2. Use `rlm_call` on small, relevant subsets instead of passing everything.
3. Respond with a single ```python fenced code block and nothing else.

Question: {}"#,
        depth, max_depth, keys, query
    )
}

/// Build the prompt that answers `query` from the rendered context alone
pub fn direct_answer_prompt(query: &str, context: &Context, budget: usize) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        DIRECT_ANSWER_HEADER,
        render_context(context, budget),
        query
    )
}

/// Concatenate every entry as `### key` followed by its text, cut to `budget` characters
pub fn render_context(context: &Context, budget: usize) -> String {
    let rendered = context
        .iter()
        .map(|(key, value)| format!("### {}\n{}", key, value))
        .collect::<Vec<_>>()
        .join("\n\n");

    if rendered.chars().count() <= budget {
        return rendered;
    }

    format!(
        "{}\n\n[... context truncated at {} characters ...]",
        truncate(&rendered, budget),
        budget
    )
}
