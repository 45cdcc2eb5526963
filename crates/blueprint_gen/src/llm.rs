//! Text-generation capability.
//!
//! The pipeline only needs `prompt in, text out`. [`LlmAdapter`] provides that
//! over the OpenAI and Anthropic HTTP APIs, selected via settings or
//! environment variables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenError, GenResult};
use crate::settings::GeneratorSettings;

/// Prompt in, text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`, using at most `max_tokens` output tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenResult<String>;
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    fn key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-5-mini",
            Self::Anthropic => "claude-sonnet-4.5",
        }
    }
}

/// Attempts per call for transient HTTP failures.
const MAX_ATTEMPTS: u32 = 3;

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            provider,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Create an LLM adapter from environment variables
    ///
    /// Checks in order:
    /// 1. OPENAI_API_KEY
    /// 2. ANTHROPIC_API_KEY
    pub fn from_env() -> GenResult<Self> {
        let custom_model = std::env::var("BLUEPRINT_LLM_MODEL").ok();

        for provider in [LlmProvider::OpenAI, LlmProvider::Anthropic] {
            if let Some(api_key) = api_key(provider) {
                return Ok(Self::new(provider, api_key, custom_model));
            }
        }

        Err(GenError::LlmNotConfigured)
    }

    /// Create an LLM adapter from generator settings, falling back to the
    /// environment when no provider is pinned.
    pub fn from_settings(settings: &GeneratorSettings) -> GenResult<Self> {
        match settings.default_provider {
            Some(provider) => {
                let api_key = api_key(provider).ok_or(GenError::LlmNotConfigured)?;
                Ok(Self::new(provider, api_key, settings.default_model.clone()))
            }
            None => {
                let mut adapter = Self::from_env()?;
                if let Some(model) = &settings.default_model {
                    adapter.model = model.clone();
                }
                Ok(adapter)
            }
        }
    }

    /// Get the current provider
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_openai(&self, prompt: &str, max_tokens: u32) -> GenResult<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_completion_tokens: Some(max_tokens),
        };

        let builder = || {
            self.client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
        };

        let result: OpenAIResponse = self.send_with_retry("OpenAI", builder).await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenError::Llm("No response from OpenAI".to_string()))
    }

    async fn complete_anthropic(&self, prompt: &str, max_tokens: u32) -> GenResult<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let builder = || {
            self.client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&request)
        };

        let result: AnthropicResponse = self.send_with_retry("Anthropic", builder).await?;
        let text: String = result.content.into_iter().map(|c| c.text).collect();
        if text.is_empty() {
            return Err(GenError::Llm("No response from Anthropic".to_string()));
        }
        Ok(text)
    }

    /// Send a request, retrying network errors, 5xx and 429 with exponential backoff.
    async fn send_with_retry<T, F>(&self, vendor: &str, build: F) -> GenResult<T>
    where
        T: for<'de> Deserialize<'de>,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = std::time::Duration::from_secs(1 << (attempt - 1));
                debug!("Retrying {} call in {:?}", vendor, delay);
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} network error (attempt {}/{}): {}", vendor, attempt + 1, MAX_ATTEMPTS, e);
                    last_error = Some(GenError::Llm(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                warn!("{} API error {} (attempt {}/{})", vendor, status, attempt + 1, MAX_ATTEMPTS);
                last_error = Some(GenError::Llm(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    vendor,
                    status,
                    attempt + 1,
                    MAX_ATTEMPTS,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GenError::Llm(format!("{} API error {}: {}", vendor, status, body)));
            }

            return response
                .json()
                .await
                .map_err(|e| GenError::Llm(format!("Failed to parse response: {}", e)));
        }

        Err(last_error.unwrap_or_else(|| GenError::Llm("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl TextGenerator for LlmAdapter {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenResult<String> {
        debug!(
            "Calling {:?} model {} ({} prompt chars, {} max tokens)",
            self.provider,
            self.model,
            prompt.len(),
            max_tokens
        );
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(prompt, max_tokens).await,
            LlmProvider::Anthropic => self.complete_anthropic(prompt, max_tokens).await,
        }
    }
}

fn api_key(provider: LlmProvider) -> Option<String> {
    std::env::var(provider.key_var())
        .ok()
        .filter(|key| !key.is_empty())
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        let openai = LlmAdapter::new(LlmProvider::OpenAI, "key".to_string(), None);
        assert_eq!(openai.model(), "gpt-5-mini");

        let anthropic = LlmAdapter::new(LlmProvider::Anthropic, "key".to_string(), None);
        assert_eq!(anthropic.model(), "claude-sonnet-4.5");
    }

    #[test]
    fn test_custom_model() {
        let adapter = LlmAdapter::new(
            LlmProvider::OpenAI,
            "key".to_string(),
            Some("gpt-4.1".to_string()),
        );
        assert_eq!(adapter.model(), "gpt-4.1");
        assert_eq!(adapter.provider(), &LlmProvider::OpenAI);
    }

    #[test]
    fn test_provider_wire_names() {
        assert_eq!(serde_json::to_string(&LlmProvider::OpenAI).unwrap(), "\"openai\"");
        let parsed: LlmProvider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, LlmProvider::Anthropic);
    }
}
