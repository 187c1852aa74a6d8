//! Generation client for OpenAI-compatible chat completion APIs.
//!
//! Works with any service exposing `POST {base_url}/chat/completions`:
//! vLLM or SGLang serving a local model, Ollama, LM Studio, or hosted APIs.
//!
//! # Configuration Example
//!
//! ```toml
//! [generation]
//! provider = "openai_compatible"
//! base_url = "http://localhost:8000/v1"
//! model = "kimi-k2"
//! api_key_env = "LONGEVITY_RAG_API_KEY"
//! max_tokens = 512
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::GenerationClient;
use crate::config::GenerationConfig;
use crate::error::{AdvisoryError, Result};
use crate::retry::RetryExecutor;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessageRequest<'a>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug)]
pub struct OpenAICompatibleClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    retry_transient: bool,
    retry: RetryExecutor,
}

impl OpenAICompatibleClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000/v1`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdvisoryError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            system_prompt: None,
            temperature: None,
            retry_transient: true,
            retry: RetryExecutor::new(),
        })
    }

    /// Create a client from the `[generation]` configuration section.
    ///
    /// A key variable that is unset is logged and the client runs without
    /// authentication, which is what local servers expect.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let mut client = Self::new(
            &config.base_url,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_retries(config.retry_transient);
        client.temperature = config.temperature;

        if let Some(var) = &config.api_key_env {
            match std::env::var(var) {
                Ok(key) if !key.is_empty() => client.api_key = Some(key),
                _ => warn!("{} is not set; calling {} without an API key", var, config.base_url),
            }
        }

        Ok(client)
    }

    /// Set the bearer API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Send a system message before the prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Enable or disable retrying transient failures.
    pub fn with_retries(mut self, enabled: bool) -> Self {
        self.retry_transient = enabled;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = self.chat_completions_url();
        debug!("Generation request: url={} model={}", url, request.model);

        let mut builder = self.client.post(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.json(request).send().await.map_err(|e| {
            warn!("Network error calling generation API: {}", e);
            AdvisoryError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            warn!("Generation API error: status={} message={}", status, message);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => AdvisoryError::RateLimited(message),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AdvisoryError::AuthError(message)
                }
                _ => AdvisoryError::ApiError(format!(
                    "generation API {}: {}",
                    status.as_u16(),
                    message
                )),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| AdvisoryError::ApiError("No choices in response".to_string()))?;

        debug!("Generation response: {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl GenerationClient for OpenAICompatibleClient {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(MessageRequest {
                role: "system",
                content: system,
            });
        }
        messages.push(MessageRequest {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        if self.retry_transient {
            self.retry.execute_auto(|| self.send(&request)).await
        } else {
            self.send(&request).await
        }
    }
}
