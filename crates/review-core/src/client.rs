//! Chat completion client for the model service.
//!
//! Talks to an OpenRouter-compatible `/chat/completions` endpoint. The
//! configured timeout bounds the whole call, retries included. Transport
//! failures are retried with exponential backoff while that budget lasts.
//! Dropping the returned future aborts the in-flight request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::ModelSettings;
use crate::error::{PipelineError, Result};
use crate::prompt::CompletionPrompt;

/// Base delay before the first retry.
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// TCP connect bound, independent of the overall call timeout.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Something that turns a prompt into completion text.
///
/// The pipeline only depends on this trait, so tests can substitute stubs
/// for the HTTP client.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Return the text of the first completion choice.
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String>;
}

/// Exponential backoff for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// HTTP client for the chat completion endpoint.
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
    /// Budget for one `complete` call, all attempts and backoff included.
    deadline: Duration,
    /// Bound on a single HTTP attempt.
    attempt_timeout: Duration,
}

impl ChatCompletionClient {
    /// Build a client from model settings.
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(settings.timeout))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry: RetryPolicy {
                max_attempts: settings.max_attempts.max(1),
                ..RetryPolicy::default()
            },
            deadline: settings.timeout,
            attempt_timeout: settings.timeout,
        })
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    /// Bound each attempt separately from the overall deadline.
    ///
    /// The deadline still wins: an attempt never outlives the call.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Send one chat completion request, without retries.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        trace!("Sending chat request: {:?}", request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Review Responder")
            .timeout(self.attempt_timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        interpret_response(status.as_u16(), &body)
    }
}

#[async_trait]
impl ModelService for ChatCompletionClient {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String> {
        match tokio::time::timeout(self.deadline, self.complete_with_retry(prompt)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Model call deadline exceeded");
                Err(PipelineError::TransportFailure(format!(
                    "request timed out after {:?}",
                    self.deadline
                )))
            }
        }
    }
}

impl ChatCompletionClient {
    async fn complete_with_retry(&self, prompt: &CompletionPrompt) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.chat(prompt.to_messages()).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map a status code and raw body to completion text or an error.
pub fn interpret_response(status: u16, body: &str) -> Result<String> {
    if status == 429 {
        return Err(PipelineError::RateLimited(body.to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(PipelineError::upstream(status, body));
    }

    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::malformed(format!("failed to parse response: {}", e)))?;

    if let Some(error) = response.error {
        return Err(PipelineError::upstream(status, error.message));
    }

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::malformed("no completion choices in response"))?
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PipelineError::malformed("empty completion content"))?;

    debug!(chars = content.chars().count(), "Completion received");
    Ok(content)
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A `{role, content}` chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,

    /// Some gateways report failures in a 200 body.
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// A choice in the completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
}

/// Message in a completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// Error object embedded in a response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
}
