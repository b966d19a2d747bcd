// ============================================
// Heuristic Scorer
// ============================================
//
// Deterministic, I/O-free relevance estimate used for pre-ranking and as
// the fallback when external scoring is unavailable.
//
// score = 1.2 * interest_hits + 0.8 * boost_hits - 0.7 * down_hits + recency

use super::profile::ProfileModel;
use crate::models::DigestCandidate;
use crate::utils::tokenize;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-hit weights and recency bonus shape
#[derive(Debug, Clone)]
pub struct HeuristicWeights {
    pub interest: f64,
    pub boost: f64,
    pub down: f64,
    /// Bonus for a digest created right now
    pub max_recency_bonus: f64,
    /// Age at which the bonus reaches zero
    pub recency_window_hours: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            interest: 1.2,
            boost: 0.8,
            down: 0.7,
            max_recency_bonus: 1.5,
            recency_window_hours: 24.0,
        }
    }
}

/// Raw counts behind a heuristic score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicBreakdown {
    pub interest_hits: usize,
    pub boost_hits: usize,
    pub down_hits: usize,
    pub recency: f64,
}

impl HeuristicBreakdown {
    pub fn reason(&self) -> String {
        format!(
            "interest={}, boost={}, down={}, recency={:.2}",
            self.interest_hits, self.boost_hits, self.down_hits, self.recency
        )
    }
}

pub struct HeuristicScorer {
    model: Arc<ProfileModel>,
    weights: HeuristicWeights,
}

impl HeuristicScorer {
    pub fn new(model: Arc<ProfileModel>) -> Self {
        Self::with_weights(model, HeuristicWeights::default())
    }

    pub fn with_weights(model: Arc<ProfileModel>, weights: HeuristicWeights) -> Self {
        Self { model, weights }
    }

    /// Score a digest relative to `now`; returns `(score, rationale)`
    pub fn score(&self, digest: &DigestCandidate, now: DateTime<Utc>) -> (f64, String) {
        let breakdown = self.breakdown(digest, now);
        (self.combine(&breakdown), breakdown.reason())
    }

    pub fn breakdown(&self, digest: &DigestCandidate, now: DateTime<Utc>) -> HeuristicBreakdown {
        let tokens = tokenize(&format!("{} {}", digest.title, digest.summary));

        HeuristicBreakdown {
            interest_hits: tokens.intersection(self.model.interest_tokens()).count(),
            boost_hits: tokens.intersection(self.model.boost_terms()).count(),
            down_hits: tokens.intersection(self.model.down_terms()).count(),
            recency: self.recency_bonus(digest.created_at, now),
        }
    }

    fn combine(&self, breakdown: &HeuristicBreakdown) -> f64 {
        breakdown.interest_hits as f64 * self.weights.interest
            + breakdown.boost_hits as f64 * self.weights.boost
            - breakdown.down_hits as f64 * self.weights.down
            + breakdown.recency
    }

    /// Linear decay from `max_recency_bonus` at age 0 to 0 at the window
    /// edge. Future timestamps count as age 0; missing ones earn nothing.
    fn recency_bonus(&self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(created_at) = created_at else {
            return 0.0;
        };

        let age_hours = ((now - created_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        let bonus = self.weights.max_recency_bonus
            - (age_hours / self.weights.recency_window_hours) * self.weights.max_recency_bonus;

        bonus.max(0.0)
    }
}
