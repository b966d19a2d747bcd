pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::{DigestCandidate, RankedArticle, RankedDigestList, ReaderProfile};
pub use services::{
    CuratorAgent, CuratorError, HeuristicScorer, LlmProvider, PreRankLayer, ProfileModel,
    RelevanceScorer, ScoringOutcome,
};
