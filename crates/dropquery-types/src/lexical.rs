//! Lexical heuristic for text typed into unrecognized chat-like inputs.

/// Task-verb phrases that suggest the text is a prompt.
pub const TASK_PHRASES: &[&str] = &[
    "explain",
    "what is",
    "how to",
    "tell me",
    "write",
    "generate",
    "create",
    "summarize",
    "translate",
    "analyze",
    "compare",
    "describe",
    "define",
    "help me",
    "assist",
    "suggest",
];

/// Texts longer than this many characters count as prompts regardless of
/// wording.
pub const MIN_PROMPT_CHARS: usize = 10;

/// Decide whether `text` submitted from a generic input is likely an AI query.
///
/// True when the text contains a task phrase, when the page carries a chat
/// interface marker, or when the text is longer than [`MIN_PROMPT_CHARS`].
///
/// ```
/// use dropquery_types::lexical::is_likely_ai_query;
///
/// assert!(is_likely_ai_query("Explain X", false));
/// assert!(!is_likely_ai_query("hi", false));
/// assert!(is_likely_ai_query("hi", true));
/// ```
#[must_use]
pub fn is_likely_ai_query(text: &str, page_has_chat_marker: bool) -> bool {
    let lower = text.to_lowercase();
    TASK_PHRASES.iter().any(|phrase| lower.contains(phrase))
        || page_has_chat_marker
        || text.chars().count() > MIN_PROMPT_CHARS
}

/// Whether an element's class or id suggests a chat interface.
///
/// Classes containing `chat` or `message` qualify, as do ids containing `chat`.
#[must_use]
pub fn suggests_chat_interface(class: Option<&str>, id: Option<&str>) -> bool {
    let class_hit = class.is_some_and(|c| {
        let c = c.to_lowercase();
        c.contains("chat") || c.contains("message")
    });
    let id_hit = id.is_some_and(|i| i.to_lowercase().contains("chat"));
    class_hit || id_hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_phrase_matches_short_text() {
        assert!(is_likely_ai_query("define qi", false));
        assert!(is_likely_ai_query("HOW TO", false));
    }

    #[test]
    fn test_short_plain_text_rejected() {
        assert!(!is_likely_ai_query("ok thanks", false));
        assert!(!is_likely_ai_query("", false));
    }

    #[test]
    fn test_length_threshold_is_exclusive() {
        // exactly 10 characters is not enough on its own
        assert!(!is_likely_ai_query("abcdefghij", false));
        assert!(is_likely_ai_query("abcdefghijk", false));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 5 multi-byte characters
        assert!(!is_likely_ai_query("ééééé", false));
    }

    #[test]
    fn test_chat_marker_forces_true() {
        assert!(is_likely_ai_query("yo", true));
    }

    #[test]
    fn test_chat_interface_markers() {
        assert!(suggests_chat_interface(Some("ChatPanel"), None));
        assert!(suggests_chat_interface(Some("message-list"), None));
        assert!(suggests_chat_interface(None, Some("chat-root")));
        // ids only qualify through "chat"
        assert!(!suggests_chat_interface(None, Some("message-root")));
        assert!(!suggests_chat_interface(Some("nav"), Some("header")));
        assert!(!suggests_chat_interface(None, None));
    }
}
