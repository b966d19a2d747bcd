//! Best-effort parsing of the scoring reply.
//!
//! The model is asked for bare JSON but often wraps it in a Markdown fence
//! or adds prose around it. Everything outside the outermost `{...}` span is
//! discarded; malformed entries inside `articles` are skipped individually.

use super::{ExternalScoreMap, ParseError};
use serde_json::Value;
use tracing::debug;

const FENCE: &str = "```";

/// Remove a surrounding Markdown code fence and its optional language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(idx) if !rest[..idx].contains('{') => &rest[idx + 1..],
        _ => rest,
    };

    match body.find(FENCE) {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Slice from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Result<&str, ParseError> {
    let body = strip_code_fence(text);
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&body[start..=end]),
        _ => Err(ParseError::NoJsonObject),
    }
}

pub fn parse_scores(text: &str) -> Result<ExternalScoreMap, ParseError> {
    let json = extract_json_object(text)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let articles = value
        .get("articles")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingArticles)?;

    let mut scores = ExternalScoreMap::default();
    for (idx, entry) in articles.iter().enumerate() {
        let digest_id = entry
            .get("digest_id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty());
        let score = entry
            .get("relevance_score")
            .and_then(Value::as_f64)
            .filter(|s| s.is_finite());

        match (digest_id, score) {
            (Some(digest_id), Some(score)) => scores.insert(digest_id, score),
            _ => {
                debug!(index = idx, entry = %entry, "Skipping malformed score entry");
                scores.record_skipped();
            }
        }
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"{"articles": [{"digest_id": "openai:1", "relevance_score": 8.5}, {"digest_id": "youtube:2", "relevance_score": 3}]}"#;

    #[test]
    fn test_bare_json() {
        let scores = parse_scores(BARE).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get("openai:1"), Some(8.5));
        assert_eq!(scores.get("youtube:2"), Some(3.0));
    }

    #[test]
    fn test_fenced_with_language_tag_matches_bare() {
        let fenced = format!("```json\n{}\n```", BARE);
        assert_eq!(parse_scores(&fenced).unwrap(), parse_scores(BARE).unwrap());

        let upper = format!("```JSON\n{}\n```\n", BARE);
        assert_eq!(parse_scores(&upper).unwrap(), parse_scores(BARE).unwrap());
    }

    #[test]
    fn test_fenced_without_tag() {
        let fenced = format!("```\n{}\n```", BARE);
        assert_eq!(parse_scores(&fenced).unwrap(), parse_scores(BARE).unwrap());

        let inline = format!("```{}```", BARE);
        assert_eq!(parse_scores(&inline).unwrap(), parse_scores(BARE).unwrap());
    }

    #[test]
    fn test_surrounding_prose_is_noise() {
        let noisy = format!("Sure! Here are the scores:\n{}\nLet me know if you need more.", BARE);
        assert_eq!(parse_scores(&noisy).unwrap().len(), 2);
    }

    #[test]
    fn test_no_object() {
        assert_eq!(parse_scores(""), Err(ParseError::NoJsonObject));
        assert_eq!(parse_scores("no json here"), Err(ParseError::NoJsonObject));
        assert_eq!(parse_scores("} backwards {"), Err(ParseError::NoJsonObject));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_scores(r#"{"articles": [{"digest_id": "a", "relevance_score": }]}"#),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_articles() {
        assert_eq!(parse_scores(r#"{"scores": []}"#), Err(ParseError::MissingArticles));
        assert_eq!(
            parse_scores(r#"{"articles": {"a": 1}}"#),
            Err(ParseError::MissingArticles)
        );
    }

    #[test]
    fn test_empty_articles_is_success() {
        let scores = parse_scores(r#"{"articles": []}"#).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let text = r#"{"articles": [
            {"digest_id": "ok", "relevance_score": 6.0},
            {"digest_id": "", "relevance_score": 9.0},
            {"digest_id": "str-score", "relevance_score": "7"},
            {"relevance_score": 5.0},
            {"digest_id": 42, "relevance_score": 5.0},
            {"digest_id": "no-score"},
            "garbage"
        ]}"#;
        let scores = parse_scores(text).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.get("ok"), Some(6.0));
        assert_eq!(scores.skipped(), 6);
    }

    #[test]
    fn test_out_of_range_scores_kept_raw() {
        let scores =
            parse_scores(r#"{"articles": [{"digest_id": "a", "relevance_score": 14.2}]}"#).unwrap();
        assert_eq!(scores.get("a"), Some(14.2));
    }
}
