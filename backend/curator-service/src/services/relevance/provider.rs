// ============================================
// LLM Providers
// ============================================
//
// Text-completion backends used for relevance scoring:
// - OpenAI-compatible chat completions (Groq, OpenAI)
// - Ollama `/api/generate` for local models

use super::{LlmError, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One completion call: fixed system instruction plus user content
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Raw completion text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Setup(format!("failed to create HTTP client: {}", e)))
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        body,
    })
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Transport(format!("request timed out: {}", e))
    } else {
        LlmError::Transport(e.to_string())
    }
}

// ============================================
// OpenAI-compatible chat completions
// ============================================

pub struct OpenAiCompatibleProvider {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Fails without an API key; the curator is unusable without credentials.
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingCredentials);
        }

        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let result: ChatCompletionResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::MalformedPayload(e.to_string()))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedPayload("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        debug!(model = %self.model, chars = content.len(), "Chat completion received");
        Ok(content.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

// ============================================
// Ollama
// ============================================

pub struct OllamaProvider {
    client: HttpClient,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.user,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let result: GenerateResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::MalformedPayload(e.to_string()))?;

        debug!(model = %self.model, chars = result.response.len(), "Ollama generation received");
        Ok(result.response.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
