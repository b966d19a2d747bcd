// Utility functions for curator-service

use std::collections::HashSet;

/// Minimum token length kept by [`tokenize`]
pub const MIN_TOKEN_LEN: usize = 4;

/// Split text into the set of lowercase ASCII alphanumeric runs of at least
/// [`MIN_TOKEN_LEN`] characters. Everything else is a separator.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|run| run.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim_end()),
    }
}

/// Clamp a relevance score into [0, 10]
pub fn clamp_relevance(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> HashSet<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_drops_short_runs() {
        assert_eq!(tokenize("GPT-4 Release Notes!!"), set(&["release", "notes"]));
        assert!(tokenize("gpt-4").is_empty());
        assert_eq!(tokenize("scalability"), set(&["scalability"]));
    }

    #[test]
    fn test_tokenize_keeps_alphanumeric_runs() {
        assert_eq!(tokenize("gpt4 o1-preview"), set(&["gpt4", "preview"]));
        assert_eq!(tokenize("LLaMA3.1 8B"), set(&["llama3"]));
    }

    #[test]
    fn test_tokenize_empty_and_non_ascii() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert_eq!(tokenize("café latency"), set(&["latency"]));
    }

    #[test]
    fn test_tokenize_dedupes() {
        assert_eq!(tokenize("Agent agent AGENT"), set(&["agent"]));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly", 7), "exactly");
        assert_eq!(truncate_chars("hello world", 6), "hello...");
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }

    #[test]
    fn test_clamp_relevance() {
        assert_eq!(clamp_relevance(12.0), 10.0);
        assert_eq!(clamp_relevance(-1.0), 0.0);
        assert_eq!(clamp_relevance(7.5), 7.5);
        assert_eq!(clamp_relevance(f64::NAN), 0.0);
    }
}
