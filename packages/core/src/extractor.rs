// ABOUTME: Extracts executable Python code from free-form model responses
// ABOUTME: Prefers tagged fenced blocks, then generic fences, then bare code with RLM markers

use regex::Regex;
use std::sync::LazyLock;

static TAGGED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:python3?|py)[ \t]*\r?\n(.*?)```").expect("valid tagged fence regex")
});

static GENERIC_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+.-]*[ \t]*\r?\n(.*?)```").expect("valid generic fence regex")
});

static RESULT_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*result\s*=(?:[^=]|$)").expect("valid result assignment regex")
});

static RECURSIVE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brlm_call\s*\(").expect("valid rlm_call regex"));

/// Pull the code the model intended to run out of `response`.
///
/// Returns `None` when nothing executable was found; callers fall back to
/// answering directly.
pub fn extract_code(response: &str) -> Option<String> {
    if let Some(code) = first_capture(&TAGGED_FENCE, response) {
        return non_empty(code);
    }

    if let Some(code) = first_capture(&GENERIC_FENCE, response) {
        return non_empty(code);
    }

    let trimmed = response.trim();
    if RESULT_ASSIGNMENT.is_match(trimmed) || RECURSIVE_CALL.is_match(trimmed) {
        return non_empty(trimmed);
    }

    None
}

fn first_capture<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn non_empty(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}
