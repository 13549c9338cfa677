// ABOUTME: Shared utility functions for the RLM engine
// ABOUTME: Session ID generation and char-boundary-safe truncation

use uuid::Uuid;

/// Generate a unique session ID.
///
/// Uses the hyphen-free UUID form so the ID is valid in sandbox paths and
/// identifiers without escaping.
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Return the longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_id() {
        let id1 = generate_session_id();
        let id2 = generate_session_id();

        assert_eq!(id1.len(), 32);
        assert_ne!(id1, id2);
        assert!(id1.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_truncate_short_text_is_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 4), "héll");
        assert_eq!(truncate("日本語テキスト", 3), "日本語");
        assert_eq!(truncate("abc", 0), "");
    }
}
