//! OpenRouter chat-completions client with automatic retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::error::{LlmError, RetryConfig};
use super::LanguageModel;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterModel {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    retry_config: RetryConfig,
}

impl OpenRouterModel {
    pub fn new(api_key: String, model: String, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            temperature,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "Knowledge Nexus")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {}", e))
                } else {
                    LlmError::network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), body, retry_after));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::parse(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::empty_response("No content in response"))
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let start = Instant::now();
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempts = attempt + 1,
                            elapsed = ?start.elapsed(),
                            "Model request succeeded after retry"
                        );
                    }
                    return Ok(text);
                }
                Err(error) if self.retry_config.should_retry(&error, attempt) => {
                    let remaining = self
                        .retry_config
                        .max_retry_duration
                        .saturating_sub(start.elapsed());
                    let delay = error.suggested_delay(attempt).min(remaining);
                    if delay.is_zero() {
                        tracing::warn!(%error, "Model retry budget exhausted");
                        return Err(error);
                    }
                    tracing::warn!(
                        attempt = attempt + 1,
                        kind = %error.kind,
                        delay = ?delay,
                        "Model request failed, retrying: {}",
                        error.message
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(model = %self.model, %error, "Model request failed");
                    return Err(error);
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
