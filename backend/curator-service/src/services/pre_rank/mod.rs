// ============================================
// Pre-Rank Layer
// ============================================
//
// Cheap deterministic gate in front of LLM scoring: the whole pool is
// scored heuristically and only the top `keep` digests move on, so the
// external request size stays fixed regardless of pool size.

use super::heuristic::HeuristicScorer;
use crate::models::{DigestCandidate, ScoredDigest};
use chrono::{DateTime, Utc};
use tracing::info;

pub const DEFAULT_PRE_RANK_KEEP: usize = 25;

pub struct PreRankLayer {
    scorer: HeuristicScorer,
    keep: usize,
}

impl PreRankLayer {
    pub fn new(scorer: HeuristicScorer, keep: usize) -> Self {
        Self { scorer, keep }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Top `min(keep, pool.len())` digests by heuristic score, descending.
    /// Equal scores keep their pool order.
    pub fn shortlist(&self, pool: &[DigestCandidate], now: DateTime<Utc>) -> Vec<ScoredDigest> {
        if pool.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredDigest> = pool
            .iter()
            .map(|digest| {
                let (heuristic_score, heuristic_reason) = self.scorer.score(digest, now);
                ScoredDigest {
                    digest: digest.clone(),
                    heuristic_score,
                    heuristic_reason,
                }
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.heuristic_score.total_cmp(&a.heuristic_score));
        scored.truncate(self.keep.min(pool.len()));

        info!(
            pool_size = pool.len(),
            shortlist_size = scored.len(),
            top_score = scored.first().map(|s| s.heuristic_score),
            "Pre-rank completed"
        );

        scored
    }
}
