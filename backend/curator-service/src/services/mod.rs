pub mod curator;
pub mod heuristic;
pub mod pre_rank;
pub mod profile;
pub mod relevance;

pub use curator::{
    fallback_score, CurationReport, CuratorAgent, CuratorError, CuratorSettings, RankingPath,
};
pub use heuristic::{HeuristicBreakdown, HeuristicScorer, HeuristicWeights};
pub use pre_rank::PreRankLayer;
pub use profile::ProfileModel;
pub use relevance::{
    LlmError, LlmProvider, OllamaProvider, OpenAiCompatibleProvider, ParseError,
    RelevanceScorer, ScoringOutcome,
};
