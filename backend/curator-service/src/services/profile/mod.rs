// ============================================
// Reader Profile Model
// ============================================
//
// Token vocabularies derived once from the reader profile:
// - interest tokens: tokenized interest phrases
// - boost terms: fixed vocabulary of enabled `prefer_*` flags
// - down terms: fixed vocabulary of enabled `avoid_*` flags

use crate::models::ReaderProfile;
use crate::utils::tokenize;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Boost,
    Down,
}

/// Preference flag → fixed vocabulary it contributes when enabled
struct PreferenceRule {
    flag: &'static str,
    polarity: Polarity,
    terms: &'static [&'static str],
}

const PREFERENCE_RULES: &[PreferenceRule] = &[
    PreferenceRule {
        flag: "prefer_system_design",
        polarity: Polarity::Boost,
        terms: &["architecture", "pipeline", "scalability", "latency", "reliability"],
    },
    PreferenceRule {
        flag: "prefer_implementation_details",
        polarity: Polarity::Boost,
        terms: &["implementation", "benchmark", "evaluation", "metrics", "code"],
    },
    PreferenceRule {
        flag: "prefer_production_realism",
        polarity: Polarity::Boost,
        terms: &["production", "deployment", "monitoring", "incident", "cost"],
    },
    PreferenceRule {
        flag: "avoid_marketing_hype",
        polarity: Polarity::Down,
        terms: &["webinar", "register", "limited", "launch", "partnership"],
    },
];

/// Immutable token sets used by heuristic scoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileModel {
    interest_tokens: HashSet<String>,
    boost_terms: HashSet<String>,
    down_terms: HashSet<String>,
}

impl ProfileModel {
    pub fn from_profile(profile: &ReaderProfile) -> Self {
        let interest_tokens = tokenize(&profile.interests.join(" "));

        let mut boost_terms = HashSet::new();
        let mut down_terms = HashSet::new();

        for rule in PREFERENCE_RULES {
            if !profile.preference(rule.flag) {
                continue;
            }
            let target = match rule.polarity {
                Polarity::Boost => &mut boost_terms,
                Polarity::Down => &mut down_terms,
            };
            target.extend(rule.terms.iter().map(|t| t.to_string()));
        }

        for (flag, enabled) in &profile.preferences {
            if *enabled && !PREFERENCE_RULES.iter().any(|rule| rule.flag == flag.as_str()) {
                debug!(flag = %flag, "Preference flag has no vocabulary rule");
            }
        }

        debug!(
            interest_tokens = interest_tokens.len(),
            boost_terms = boost_terms.len(),
            down_terms = down_terms.len(),
            "Profile model built"
        );

        Self {
            interest_tokens,
            boost_terms,
            down_terms,
        }
    }

    pub fn interest_tokens(&self) -> &HashSet<String> {
        &self.interest_tokens
    }

    pub fn boost_terms(&self) -> &HashSet<String> {
        &self.boost_terms
    }

    pub fn down_terms(&self) -> &HashSet<String> {
        &self.down_terms
    }
}
