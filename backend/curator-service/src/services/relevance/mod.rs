// ============================================
// External Relevance Scorer (LLM 相關性打分)
// ============================================
//
// Sends the pre-ranked shortlist to a text-generation service and parses a
// small JSON reply into digest_id -> relevance_score.
//
// The scorer never decides what to do on failure: it reports one of three
// outcomes and the curator picks the fallback.
//
//   shortlist ──► prompt ──► LlmProvider ──► parser ──► ScoringOutcome
//                                 │              │
//                                 ▼              ▼
//                            Unavailable     Unparseable

pub mod parser;
pub mod prompt;
pub mod provider;

pub use prompt::PromptLimits;
pub use provider::{
    CompletionRequest, LlmProvider, OllamaProvider, OpenAiCompatibleProvider,
};

#[cfg(test)]
pub use provider::MockLlmProvider;

use crate::config::{Config, ConfigError, ProviderKind};
use crate::models::{ReaderProfile, ScoredDigest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level failure: the call itself did not produce a usable reply
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingCredentials,

    #[error("LLM client setup failed: {0}")]
    Setup(String),

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM payload malformed: {0}")]
    MalformedPayload(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

/// The call succeeded but its text is not a usable score list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in LLM response")]
    NoJsonObject,

    #[error("LLM response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("LLM response has no `articles` list")]
    MissingArticles,
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// digest_id -> raw (unclamped) relevance score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalScoreMap {
    scores: HashMap<String, f64>,
    skipped: usize,
}

impl ExternalScoreMap {
    pub fn insert(&mut self, digest_id: &str, score: f64) {
        self.scores.insert(digest_id.to_string(), score);
    }

    pub fn get(&self, digest_id: &str) -> Option<f64> {
        self.scores.get(digest_id).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Entries dropped for a missing id or non-numeric score
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

impl FromIterator<(String, f64)> for ExternalScoreMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
            skipped: 0,
        }
    }
}

/// Result of one scoring attempt
#[derive(Debug)]
pub enum ScoringOutcome {
    /// Parsed reply; may cover only part of the shortlist, or none of it
    Scored(ExternalScoreMap),
    /// Reply arrived but could not be parsed
    Unparseable(ParseError),
    /// The service call failed
    Unavailable(LlmError),
}

impl ScoringOutcome {
    pub fn failure_cause(&self) -> Option<String> {
        match self {
            ScoringOutcome::Scored(_) => None,
            ScoringOutcome::Unparseable(e) => Some(e.to_string()),
            ScoringOutcome::Unavailable(e) => Some(e.to_string()),
        }
    }
}

/// Build the provider selected by configuration
pub fn provider_from_config(
    config: &Config,
) -> std::result::Result<Arc<dyn LlmProvider>, ProviderSetupError> {
    let kind = config.provider()?;
    let base_url = config.base_url()?;
    let model = config.model()?;

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Groq | ProviderKind::OpenAi => Arc::new(OpenAiCompatibleProvider::new(
            &base_url,
            &config.llm_api_key,
            &model,
            config.timeout(),
        )?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(&base_url, &model, config.timeout())?),
    };

    info!(
        provider = provider.name(),
        kind = kind.as_str(),
        model = %model,
        base_url = %base_url,
        "LLM relevance provider initialized"
    );

    Ok(provider)
}

#[derive(Debug, Error)]
pub enum ProviderSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub struct RelevanceScorer {
    provider: Arc<dyn LlmProvider>,
    limits: PromptLimits,
    timeout: Duration,
}

impl RelevanceScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, limits: PromptLimits, timeout: Duration) -> Self {
        Self {
            provider,
            limits,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// One external call for the whole shortlist
    pub async fn score(&self, profile: &ReaderProfile, shortlist: &[ScoredDigest]) -> ScoringOutcome {
        let request = prompt::build_request(profile, shortlist, &self.limits);
        let started = Instant::now();

        debug!(
            provider = self.provider.name(),
            shortlist_size = shortlist.len(),
            prompt_chars = request.system.len() + request.user.len(),
            max_tokens = request.max_tokens,
            "Requesting LLM relevance scores"
        );

        let text = match tokio::time::timeout(self.timeout, self.provider.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "LLM scoring call failed");
                return ScoringOutcome::Unavailable(e);
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout = ?self.timeout,
                    "LLM scoring call timed out"
                );
                return ScoringOutcome::Unavailable(LlmError::Timeout(self.timeout));
            }
        };

        match parser::parse_scores(&text) {
            Ok(scores) => {
                info!(
                    provider = self.provider.name(),
                    scored = scores.len(),
                    skipped = scores.skipped(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "LLM relevance scores parsed"
                );
                ScoringOutcome::Scored(scores)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    response_chars = text.len(),
                    "LLM relevance reply could not be parsed"
                );
                ScoringOutcome::Unparseable(e)
            }
        }
    }
}
