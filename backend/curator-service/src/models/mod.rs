use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A summarized article or video waiting to be ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestCandidate {
    /// Unique digest id (`article_type:article_id`)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub article_type: String,
    /// Creation time; unparseable values are read as `None`
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The reader every digest is ranked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderProfile {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub expertise_level: String,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Named boolean flags such as `prefer_system_design`
    #[serde(default)]
    pub preferences: BTreeMap<String, bool>,
}

impl ReaderProfile {
    pub fn preference(&self, flag: &str) -> bool {
        self.preferences.get(flag).copied().unwrap_or(false)
    }
}

impl Default for ReaderProfile {
    /// Applied AI engineer profile the curator ships with.
    fn default() -> Self {
        let interests = [
            "Large Language Models (LLMs) in real-world applications",
            "Retrieval-Augmented Generation (RAG) systems",
            "LLM orchestration and agent-based architectures",
            "Backend systems for AI applications",
            "Production deployment of AI models",
            "Model evaluation, reliability, and performance tuning",
            "AI system design and end-to-end pipelines",
            "Practical research with engineering impact",
            "AI infrastructure, scalability, and cost optimization",
            "Learning from real production failures and case studies",
        ];
        let preferences = [
            "prefer_practical",
            "prefer_system_design",
            "prefer_implementation_details",
            "prefer_production_realism",
            "avoid_marketing_hype",
            "avoid_theoretical_only_content",
        ];

        Self {
            name: "Rachit".to_string(),
            title: Some("Applied AI Engineer".to_string()),
            background: "Applied AI engineer with hands-on experience building backend pipelines, \
                         LLM-driven systems, and production-focused AI solutions. \
                         Strong interest in turning research ideas into reliable, scalable systems."
                .to_string(),
            expertise_level: "Intermediate to Advanced".to_string(),
            interests: interests.iter().map(|s| s.to_string()).collect(),
            preferences: preferences.iter().map(|s| (s.to_string(), true)).collect(),
        }
    }
}

/// Shortlisted digest annotated with its heuristic pre-rank score.
#[derive(Debug, Clone)]
pub struct ScoredDigest {
    pub digest: DigestCandidate,
    /// Unbounded, may be negative
    pub heuristic_score: f64,
    pub heuristic_reason: String,
}

/// Final ranking entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedArticle {
    pub digest_id: String,
    /// Always within [0.0, 10.0]
    pub relevance_score: f64,
    /// 1 = most relevant
    pub rank: usize,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedDigestList {
    pub articles: Vec<RankedArticle>,
}

impl From<Vec<RankedArticle>> for RankedDigestList {
    fn from(articles: Vec<RankedArticle>) -> Self {
        Self { articles }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a timestamp string; naive values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    let parsed = match raw {
        None => None,
        Some(RawTimestamp::Seconds(secs)) => DateTime::from_timestamp(secs, 0),
        Some(RawTimestamp::Fractional(secs)) if secs.is_finite() => {
            DateTime::from_timestamp(secs.trunc() as i64, 0)
        }
        Some(RawTimestamp::Text(text)) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() {
                debug!(value = %text, "Ignoring unparseable created_at");
            }
            parsed
        }
        Some(RawTimestamp::Fractional(_)) | Some(RawTimestamp::Other(_)) => None,
    };

    Ok(parsed)
}
