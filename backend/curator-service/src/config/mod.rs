use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "CURATOR_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Backend used for external relevance scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Groq OpenAI-compatible endpoint
    Groq,
    OpenAi,
    /// Local Ollama `/api/generate`
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama-3.1-8b-instant",
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "llama3.1:8b",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

/// Curator configuration, loaded from `CURATOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// groq | openai | ollama
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,

    /// Falls back to `GROQ_API_KEY` when unset
    #[serde(default)]
    pub llm_api_key: String,

    /// Provider default when unset
    #[serde(default)]
    pub llm_base_url: Option<String>,

    /// Provider default when unset
    #[serde(default)]
    pub llm_model: Option<String>,

    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,

    /// Upper bound on completion tokens for one scoring call
    #[serde(default = "default_llm_max_output_tokens")]
    pub llm_max_output_tokens: u32,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Shortlist size handed to the LLM
    #[serde(default = "default_pre_rank_keep")]
    pub pre_rank_keep: usize,

    /// Per-digest summary cap inside the scoring prompt
    #[serde(default = "default_summary_char_limit")]
    pub summary_char_limit: usize,
}

fn default_llm_provider() -> String {
    "groq".to_string()
}

fn default_llm_temperature() -> f32 {
    0.2
}

fn default_llm_max_output_tokens() -> u32 {
    1024
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_pre_rank_keep() -> usize {
    25 // small enough for free-tier rate limits
}

fn default_summary_char_limit() -> usize {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_provider: default_llm_provider(),
            llm_api_key: String::new(),
            llm_base_url: None,
            llm_model: None,
            llm_temperature: default_llm_temperature(),
            llm_max_output_tokens: default_llm_max_output_tokens(),
            llm_timeout_secs: default_llm_timeout_secs(),
            pre_rank_keep: default_pre_rank_keep(),
            summary_char_limit: default_summary_char_limit(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config: Config = envy::prefixed(ENV_PREFIX).from_env()?;
        if config.llm_api_key.trim().is_empty() {
            config.llm_api_key = std::env::var("GROQ_API_KEY").unwrap_or_default();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let provider = self.provider()?;

        if provider.requires_api_key() && self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "llm_api_key",
                reason: format!("required for provider '{}'", provider.as_str()),
            });
        }
        if self.pre_rank_keep == 0 {
            return Err(ConfigError::Invalid {
                field: "pre_rank_keep",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "llm_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.llm_max_output_tokens == 0 {
            return Err(ConfigError::Invalid {
                field: "llm_max_output_tokens",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.summary_char_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "summary_char_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::Invalid {
                field: "llm_temperature",
                reason: format!("{} is outside 0.0..=2.0", self.llm_temperature),
            });
        }

        Ok(())
    }

    pub fn provider(&self) -> Result<ProviderKind, ConfigError> {
        ProviderKind::parse(&self.llm_provider)
    }

    pub fn base_url(&self) -> Result<String, ConfigError> {
        Ok(match &self.llm_base_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => self.provider()?.default_base_url().to_string(),
        })
    }

    pub fn model(&self) -> Result<String, ConfigError> {
        Ok(match &self.llm_model {
            Some(model) if !model.trim().is_empty() => model.clone(),
            _ => self.provider()?.default_model().to_string(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
