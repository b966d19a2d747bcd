// ============================================
// Curator Agent (排序協調器)
// ============================================
//
// Hybrid ranking pipeline:
//
//   pool ──► PRE_RANKED ──► LLM scoring ──┬─► EXTERNAL_SCORED ──┐
//            (heuristic                   │   (missing ids use   │
//             shortlist)                  │    fallback score)   ├─► FINALIZED
//                                         └─► EXTERNAL_FAILED ───┘   (stable sort,
//                                             (all fallback)          dense ranks)
//
// LLM failures are absorbed here; callers always get a full ranking for a
// non-empty pool.

use crate::config::{Config, ConfigError};
use crate::models::{DigestCandidate, RankedArticle, ReaderProfile, ScoredDigest};
use crate::services::heuristic::HeuristicScorer;
use crate::services::pre_rank::PreRankLayer;
use crate::services::profile::ProfileModel;
use crate::services::relevance::{
    provider_from_config, LlmProvider, PromptLimits, ProviderSetupError, RelevanceScorer,
    ScoringOutcome,
};
use crate::utils::clamp_relevance;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM provider setup failed: {0}")]
    ProviderSetup(#[from] ProviderSetupError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;

/// Heuristic stand-in for an LLM score, capped so it always lands in [0, 10].
///
/// Shared by the missing-id and the failed-call paths.
pub fn fallback_score(heuristic_score: f64) -> f64 {
    clamp_relevance(3.0 + heuristic_score.min(7.0))
}

#[derive(Debug, Clone)]
pub struct CuratorSettings {
    pub pre_rank_keep: usize,
    pub limits: PromptLimits,
    pub llm_timeout: Duration,
}

impl Default for CuratorSettings {
    fn default() -> Self {
        let config = Config::default();
        Self::from(&config)
    }
}

impl From<&Config> for CuratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            pre_rank_keep: config.pre_rank_keep,
            limits: PromptLimits {
                summary_char_limit: config.summary_char_limit,
                max_output_tokens: config.llm_max_output_tokens,
                temperature: config.llm_temperature,
            },
            llm_timeout: config.timeout(),
        }
    }
}

/// Which branch produced the final scores
#[derive(Debug, Clone, PartialEq)]
pub enum RankingPath {
    /// Nothing to rank; no external call was made
    Empty,
    /// LLM scores used; `omitted` shortlisted ids fell back to heuristics
    ExternalScored { omitted: usize },
    /// LLM unusable; every item fell back to heuristics
    ExternalFailed { cause: String },
}

#[derive(Debug, Clone)]
pub struct CurationReport {
    pub articles: Vec<RankedArticle>,
    pub path: RankingPath,
    pub pool_size: usize,
}

/// Shortlisted id with its final score, before ranks are assigned
#[derive(Debug, Clone, PartialEq)]
struct FinalRow {
    digest_id: String,
    score: f64,
    reasoning: String,
}

pub struct CuratorAgent {
    profile: ReaderProfile,
    pre_rank: PreRankLayer,
    scorer: RelevanceScorer,
}

impl CuratorAgent {
    /// Profile model is derived here once and shared for the agent's lifetime
    pub fn new(
        profile: ReaderProfile,
        provider: Arc<dyn LlmProvider>,
        settings: CuratorSettings,
    ) -> Result<Self> {
        if settings.pre_rank_keep == 0 {
            return Err(CuratorError::Config(ConfigError::Invalid {
                field: "pre_rank_keep",
                reason: "must be at least 1".to_string(),
            }));
        }

        let model = Arc::new(ProfileModel::from_profile(&profile));
        let pre_rank = PreRankLayer::new(HeuristicScorer::new(model), settings.pre_rank_keep);
        let scorer = RelevanceScorer::new(provider, settings.limits, settings.llm_timeout);

        info!(
            reader = %profile.name,
            pre_rank_keep = settings.pre_rank_keep,
            provider = scorer.provider_name(),
            "Curator agent initialized"
        );

        Ok(Self {
            profile,
            pre_rank,
            scorer,
        })
    }

    /// Validate configuration and build the configured provider; fails
    /// without credentials.
    pub fn from_config(config: &Config, profile: ReaderProfile) -> Result<Self> {
        config.validate()?;
        let provider = provider_from_config(config)?;
        Self::new(profile, provider, CuratorSettings::from(config))
    }

    pub fn profile(&self) -> &ReaderProfile {
        &self.profile
    }

    /// Rank digests for the reader. Only structurally invalid input (empty
    /// or duplicate ids) is an error; LLM failures degrade to heuristics.
    pub async fn rank_digests(&self, digests: &[DigestCandidate]) -> Result<Vec<RankedArticle>> {
        Ok(self.rank_digests_with_report(digests).await?.articles)
    }

    pub async fn rank_digests_with_report(
        &self,
        digests: &[DigestCandidate],
    ) -> Result<CurationReport> {
        self.rank_at(digests, Utc::now()).await
    }

    async fn rank_at(
        &self,
        digests: &[DigestCandidate],
        now: DateTime<Utc>,
    ) -> Result<CurationReport> {
        if digests.is_empty() {
            return Ok(CurationReport {
                articles: Vec::new(),
                path: RankingPath::Empty,
                pool_size: 0,
            });
        }
        validate_pool(digests)?;

        let shortlist = self.pre_rank.shortlist(digests, now);
        let outcome = self.scorer.score(&self.profile, &shortlist).await;
        let (rows, path) = merge_scores(&shortlist, outcome);

        match &path {
            RankingPath::ExternalScored { omitted } if *omitted > 0 => {
                warn!(
                    omitted = *omitted,
                    "LLM omitted shortlisted digests, using heuristic fallback for them"
                );
            }
            RankingPath::ExternalFailed { cause } => {
                warn!(cause = %cause, "LLM ranking failed, falling back to heuristic ranking");
            }
            _ => {}
        }

        let articles = finalize(rows);

        info!(
            pool_size = digests.len(),
            ranked = articles.len(),
            path = ?path,
            "Digest ranking completed"
        );

        Ok(CurationReport {
            articles,
            path,
            pool_size: digests.len(),
        })
    }
}

fn validate_pool(digests: &[DigestCandidate]) -> Result<()> {
    let mut seen = HashSet::with_capacity(digests.len());
    for digest in digests {
        if digest.id.trim().is_empty() {
            return Err(CuratorError::InvalidInput(format!(
                "digest with title '{}' has an empty id",
                digest.title
            )));
        }
        if !seen.insert(digest.id.as_str()) {
            return Err(CuratorError::InvalidInput(format!(
                "duplicate digest id '{}'",
                digest.id
            )));
        }
    }
    Ok(())
}

/// Final score and reasoning for every shortlisted digest, in shortlist order
fn merge_scores(
    shortlist: &[ScoredDigest],
    outcome: ScoringOutcome,
) -> (Vec<FinalRow>, RankingPath) {
    match outcome {
        ScoringOutcome::Scored(scores) => {
            let mut omitted = 0;
            let rows: Vec<FinalRow> = shortlist
                .iter()
                .map(|item| {
                    let digest_id = item.digest.id.clone();
                    match scores.get(&digest_id) {
                        Some(score) => FinalRow {
                            digest_id,
                            score: clamp_relevance(score),
                            reasoning: "External relevance score (shortlisted after heuristic pre-rank)"
                                .to_string(),
                        },
                        None => {
                            omitted += 1;
                            FinalRow {
                                digest_id,
                                score: fallback_score(item.heuristic_score),
                                reasoning: format!(
                                    "Fallback heuristic (external scorer omitted this digest): {}",
                                    item.heuristic_reason
                                ),
                            }
                        }
                    }
                })
                .collect();
            (rows, RankingPath::ExternalScored { omitted })
        }
        failed @ (ScoringOutcome::Unparseable(_) | ScoringOutcome::Unavailable(_)) => {
            let cause = failed.failure_cause().unwrap_or_default();
            let rows: Vec<FinalRow> = shortlist
                .iter()
                .map(|item| FinalRow {
                    digest_id: item.digest.id.clone(),
                    score: fallback_score(item.heuristic_score),
                    reasoning: format!(
                        "Heuristic ranking (external scorer failed: {}): {}",
                        cause, item.heuristic_reason
                    ),
                })
                .collect();
            (rows, RankingPath::ExternalFailed { cause })
        }
    }
}

/// Stable sort by score descending, then dense ranks 1..=N
fn finalize(mut rows: Vec<FinalRow>) -> Vec<RankedArticle> {
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| RankedArticle {
            digest_id: row.digest_id,
            relevance_score: row.score,
            rank: idx + 1,
            reasoning: row.reasoning,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::relevance::{ExternalScoreMap, LlmError, MockLlmProvider, ParseError};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn digest(id: &str, title: &str) -> DigestCandidate {
        DigestCandidate {
            id: id.to_string(),
            title: title.to_string(),
            summary: String::new(),
            article_type: "openai".to_string(),
            created_at: None,
        }
    }

    fn scored(id: &str, heuristic_score: f64) -> ScoredDigest {
        ScoredDigest {
            digest: digest(id, id),
            heuristic_score,
            heuristic_reason: format!("h={}", heuristic_score),
        }
    }

    fn profile() -> ReaderProfile {
        ReaderProfile {
            name: "Test".to_string(),
            title: None,
            background: "Backend engineer".to_string(),
            expertise_level: "Advanced".to_string(),
            interests: vec!["retrieval agents evaluation".to_string()],
            preferences: BTreeMap::from([("prefer_system_design".to_string(), true)]),
        }
    }

    fn settings(keep: usize) -> CuratorSettings {
        CuratorSettings {
            pre_rank_keep: keep,
            ..Default::default()
        }
    }

    fn agent_with_reply(
        keep: usize,
        reply: impl Fn() -> crate::services::relevance::Result<String> + Send + Sync + 'static,
    ) -> CuratorAgent {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock");
        provider.expect_complete().returning(move |_| reply());
        CuratorAgent::new(profile(), Arc::new(provider), settings(keep)).unwrap()
    }

    fn assert_dense_and_sorted(articles: &[RankedArticle]) {
        for (idx, article) in articles.iter().enumerate() {
            assert_eq!(article.rank, idx + 1);
            assert!((0.0..=10.0).contains(&article.relevance_score));
        }
        for pair in articles.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[test]
    fn test_fallback_score_formula() {
        assert_eq!(fallback_score(0.0), 3.0);
        assert_eq!(fallback_score(2.5), 5.5);
        assert_eq!(fallback_score(7.0), 10.0);
        assert_eq!(fallback_score(42.0), 10.0);
        assert_eq!(fallback_score(-1.0), 2.0);
        assert_eq!(fallback_score(-3.0), 0.0);
        assert_eq!(fallback_score(-9.5), 0.0);
    }

    #[test]
    fn test_merge_partial_scores() {
        let shortlist = vec![scored("a", 1.0), scored("b", 2.0), scored("c", 9.0)];
        let scores: ExternalScoreMap =
            [("a".to_string(), 8.0), ("c".to_string(), 11.5)].into_iter().collect();

        let (rows, path) = merge_scores(&shortlist, ScoringOutcome::Scored(scores));
        assert_eq!(path, RankingPath::ExternalScored { omitted: 1 });
        assert_eq!(rows[0].score, 8.0);
        assert_eq!(rows[1].score, 5.0);
        assert!(rows[1].reasoning.starts_with("Fallback heuristic"));
        assert!(rows[1].reasoning.ends_with("h=2"));
        assert_eq!(rows[2].score, 10.0);
        assert!(rows[2].reasoning.starts_with("External relevance score"));
    }

    #[test]
    fn test_merge_failed_call() {
        let shortlist = vec![scored("a", 1.0), scored("b", -5.0)];
        let (rows, path) = merge_scores(
            &shortlist,
            ScoringOutcome::Unavailable(LlmError::Transport("connection refused".to_string())),
        );

        assert_eq!(
            path,
            RankingPath::ExternalFailed {
                cause: "LLM transport error: connection refused".to_string()
            }
        );
        assert_eq!(rows[0].score, 4.0);
        assert_eq!(rows[1].score, 0.0);
        assert!(rows
            .iter()
            .all(|row| row.reasoning.contains("external scorer failed: LLM transport error")));
    }

    #[test]
    fn test_merge_unparseable_reply() {
        let shortlist = vec![scored("a", 0.5)];
        let (rows, path) = merge_scores(
            &shortlist,
            ScoringOutcome::Unparseable(ParseError::MissingArticles),
        );
        assert!(matches!(path, RankingPath::ExternalFailed { .. }));
        assert_eq!(rows[0].score, 3.5);
    }

    #[test]
    fn test_finalize_ties_keep_shortlist_order() {
        let rows = vec![
            FinalRow {
                digest_id: "x".to_string(),
                score: 5.0,
                reasoning: String::new(),
            },
            FinalRow {
                digest_id: "y".to_string(),
                score: 7.0,
                reasoning: String::new(),
            },
            FinalRow {
                digest_id: "z".to_string(),
                score: 5.0,
                reasoning: String::new(),
            },
        ];

        let ranked = finalize(rows);
        let order: Vec<_> = ranked.iter().map(|a| (a.digest_id.as_str(), a.rank)).collect();
        assert_eq!(order, vec![("y", 1), ("x", 2), ("z", 3)]);
    }

    #[tokio::test]
    async fn test_empty_pool_makes_no_call() {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock");
        provider.expect_complete().never();
        let agent = CuratorAgent::new(profile(), Arc::new(provider), settings(25)).unwrap();

        let report = agent.rank_at(&[], now()).await.unwrap();
        assert!(report.articles.is_empty());
        assert_eq!(report.path, RankingPath::Empty);
    }

    #[tokio::test]
    async fn test_external_scores_drive_order() {
        let agent = agent_with_reply(25, || {
            Ok(r#"{"articles": [
                {"digest_id": "a", "relevance_score": 2.0},
                {"digest_id": "b", "relevance_score": 9.5},
                {"digest_id": "c", "relevance_score": 6.0}
            ]}"#
            .to_string())
        });
        let pool = vec![
            digest("a", "retrieval agents evaluation"),
            digest("b", "cooking"),
            digest("c", "latency"),
        ];

        let report = agent.rank_at(&pool, now()).await.unwrap();
        assert_eq!(report.path, RankingPath::ExternalScored { omitted: 0 });
        let ids: Vec<_> = report.articles.iter().map(|a| a.digest_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_dense_and_sorted(&report.articles);
    }

    #[tokio::test]
    async fn test_failure_falls_back_for_every_item() {
        let agent = agent_with_reply(25, || {
            Err(LlmError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });
        // heuristic: a = 3.6, b = 0.0, c = 0.8 (latency boost)
        let pool = vec![
            digest("b", "cooking"),
            digest("a", "retrieval agents evaluation"),
            digest("c", "latency"),
        ];

        let articles = agent.rank_at(&pool, now()).await.unwrap().articles;
        let scored: Vec<_> = articles
            .iter()
            .map(|a| (a.digest_id.as_str(), a.relevance_score))
            .collect();
        assert_eq!(scored.len(), 3);
        assert_eq!(scored[0].0, "a");
        assert!((scored[0].1 - 6.6).abs() < 1e-9);
        assert_eq!(scored[1].0, "c");
        assert!((scored[1].1 - 3.8).abs() < 1e-9);
        assert_eq!(scored[2], ("b", 3.0));
        assert_dense_and_sorted(&articles);
    }

    #[tokio::test]
    async fn test_shortlist_bound_limits_output() {
        let agent = agent_with_reply(2, || Ok(r#"{"articles": []}"#.to_string()));
        let pool: Vec<_> = (0..5).map(|i| digest(&format!("d{}", i), "x")).collect();

        let report = agent.rank_at(&pool, now()).await.unwrap();
        assert_eq!(report.articles.len(), 2);
        assert_eq!(report.path, RankingPath::ExternalScored { omitted: 2 });
        assert_eq!(report.pool_size, 5);
        assert_dense_and_sorted(&report.articles);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let agent = agent_with_reply(25, || Ok(r#"{"articles": []}"#.to_string()));
        let pool = vec![digest("same", "a"), digest("same", "b")];

        let err = agent.rank_at(&pool, now()).await.unwrap_err();
        assert!(matches!(err, CuratorError::InvalidInput(ref msg) if msg.contains("same")));
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let agent = agent_with_reply(25, || Ok(r#"{"articles": []}"#.to_string()));
        let err = agent.rank_at(&[digest(" ", "a")], now()).await.unwrap_err();
        assert!(matches!(err, CuratorError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_keep_rejected() {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock");
        assert!(CuratorAgent::new(profile(), Arc::new(provider), settings(0)).is_err());
    }

    #[test]
    fn test_from_config_without_key_fails() {
        let result = CuratorAgent::from_config(&Config::default(), ReaderProfile::default());
        assert!(matches!(result, Err(CuratorError::Config(_))));
    }
}
