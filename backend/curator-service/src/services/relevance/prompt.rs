//! Scoring prompt construction.

use super::provider::CompletionRequest;
use crate::models::{ReaderProfile, ScoredDigest};
use crate::utils::truncate_chars;

const SCORE_INSTRUCTIONS: &str = r#"You are an AI news curator.

You will receive a list of digests (id, title, summary, type) and a user profile.
Your job: assign a relevance_score (0.0 to 10.0) for EACH digest.

IMPORTANT OUTPUT RULES:
- Return ONLY valid JSON
- Do NOT include markdown
- Do NOT include explanations outside JSON
- Do NOT include rank
- JSON format must be EXACTLY:
{
  "articles": [
    {"digest_id": "...", "relevance_score": 7.5},
    ...
  ]
}"#;

/// Completion tokens reserved for the JSON envelope
const ENVELOPE_TOKENS: u32 = 32;
/// Completion tokens per `{"digest_id": ..., "relevance_score": ...}` entry
const TOKENS_PER_ENTRY: u32 = 24;

#[derive(Debug, Clone)]
pub struct PromptLimits {
    pub summary_char_limit: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// System instruction: output contract followed by the reader profile.
pub fn system_prompt(profile: &ReaderProfile) -> String {
    format!(
        "{instructions}\n\nUser Profile:\nName: {name}\nBackground: {background}\nExpertise Level: {expertise}\nInterests: {interests}",
        instructions = SCORE_INSTRUCTIONS,
        name = profile.name,
        background = profile.background,
        expertise = profile.expertise_level,
        interests = profile.interests.join(", "),
    )
}

pub fn user_prompt(shortlist: &[ScoredDigest], summary_char_limit: usize) -> String {
    let blocks = shortlist
        .iter()
        .map(|scored| {
            let digest = &scored.digest;
            format!(
                "ID: {}\nTitle: {}\nSummary: {}\nType: {}",
                digest.id,
                digest.title,
                truncate_chars(&digest.summary, summary_char_limit),
                digest.article_type
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Score these {} digests by relevance. Return JSON only.\n\n{}\n",
        shortlist.len(),
        blocks
    )
}

/// Completion budget sized to the shortlist, capped by configuration
pub fn output_token_budget(shortlist_len: usize, max_output_tokens: u32) -> u32 {
    let needed = ENVELOPE_TOKENS.saturating_add(TOKENS_PER_ENTRY.saturating_mul(shortlist_len as u32));
    needed.min(max_output_tokens)
}

pub fn build_request(
    profile: &ReaderProfile,
    shortlist: &[ScoredDigest],
    limits: &PromptLimits,
) -> CompletionRequest {
    CompletionRequest {
        system: system_prompt(profile),
        user: user_prompt(shortlist, limits.summary_char_limit),
        max_tokens: output_token_budget(shortlist.len(), limits.max_output_tokens),
        temperature: limits.temperature,
    }
}
