//! Runtime configuration for the review responder.
//!
//! Secrets are never compiled in. They come from the process environment,
//! which the binary seeds from `.env.local` files before calling
//! [`Settings::from_env`].
//!
//! # Storage Structure
//!
//! ```text
//! ~/.review-responder/
//! └── config/
//!     └── .env.local   # TELEGRAM_BOT_TOKEN, OPENROUTER_API_KEY, ...
//! ```
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `OPENROUTER_API_KEY`: Model service credential
//!
//! Optional:
//! - `OPENROUTER_MODEL`: Model identifier (default: openai/gpt-4o-mini)
//! - `OPENROUTER_BASE_URL`: API base (default: https://openrouter.ai/api/v1)
//! - `REVIEW_TEMPERATURE`: Sampling temperature (default: 0.7)
//! - `REVIEW_MAX_TOKENS`: Completion length cap (default: 1024)
//! - `REVIEW_TIMEOUT_SECS`: Budget for one model call, retries included (default: 30)
//! - `REVIEW_MAX_ATTEMPTS`: Attempts on transport failure (default: 3)
//! - `REVIEW_REVEAL_ERRORS`: Show raw error detail to users (default: true)
//! - `REVIEW_RESPONDER_CONFIG_DIR`: Override the config directory

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PipelineError, Result};

pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OPENROUTER_MODEL_ENV: &str = "OPENROUTER_MODEL";
pub const OPENROUTER_BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
pub const TEMPERATURE_ENV: &str = "REVIEW_TEMPERATURE";
pub const MAX_TOKENS_ENV: &str = "REVIEW_MAX_TOKENS";
pub const TIMEOUT_ENV: &str = "REVIEW_TIMEOUT_SECS";
pub const MAX_ATTEMPTS_ENV: &str = "REVIEW_MAX_ATTEMPTS";
pub const REVEAL_ERRORS_ENV: &str = "REVIEW_REVEAL_ERRORS";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "REVIEW_RESPONDER_CONFIG_DIR";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// OpenRouter-compatible API base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const DEFAULT_STATE_DIR: &str = ".review-responder";
const CONFIG_SUBDIR: &str = "config";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Bounds accepted for the model call timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_REVIEW_CHARS: usize = 4000;

/// Get the config directory.
///
/// Defaults to `~/.review-responder/config/` or `REVIEW_RESPONDER_CONFIG_DIR`.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                .join(CONFIG_SUBDIR)
        })
}

/// Get the .env.local file path holding secrets.
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Model service settings.
#[derive(Clone)]
pub struct ModelSettings {
    /// Bearer credential for the completion endpoint.
    pub api_key: String,
    /// Model identifier (e.g., "openai/gpt-4o-mini").
    pub model: String,
    /// API base without the `/chat/completions` suffix.
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound for a whole model call, retries included.
    pub timeout: Duration,
    /// Total attempts on transport failure (1 = no retry).
    pub max_attempts: u32,
}

impl ModelSettings {
    /// Settings with defaults for everything except the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Point the client at another API base (tests, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Pipeline behaviour that does not concern the model service.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Show raw error detail to chat users. When false, users get a
    /// generic sentence and the detail only goes to the log.
    pub reveal_error_details: bool,
    /// Reviews longer than this (in chars) are rejected as invalid input.
    pub max_review_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            reveal_error_details: true,
            max_review_chars: DEFAULT_MAX_REVIEW_CHARS,
        }
    }
}

/// Everything the bot needs at startup.
#[derive(Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub model: ModelSettings,
    pub pipeline: PipelineSettings,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_token", &"<redacted>")
            .field("model", &self.model)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] if a required secret is
    /// missing or blank, or if an optional value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = required(&lookup, TELEGRAM_BOT_TOKEN_ENV)?;
        let api_key = required(&lookup, OPENROUTER_API_KEY_ENV)?;

        let mut model = ModelSettings::new(api_key);
        if let Some(name) = optional(&lookup, OPENROUTER_MODEL_ENV) {
            model.model = name;
        }
        if let Some(base_url) = optional(&lookup, OPENROUTER_BASE_URL_ENV) {
            model.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(temperature) = parsed::<f32, _>(&lookup, TEMPERATURE_ENV)? {
            model.temperature = temperature;
        }
        if let Some(max_tokens) = parsed::<u32, _>(&lookup, MAX_TOKENS_ENV)? {
            model.max_tokens = max_tokens;
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, TIMEOUT_ENV)? {
            model.timeout = Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS));
        }
        if let Some(attempts) = parsed::<u32, _>(&lookup, MAX_ATTEMPTS_ENV)? {
            model.max_attempts = attempts.max(1);
        }

        let mut pipeline = PipelineSettings::default();
        if let Some(reveal) = parsed::<bool, _>(&lookup, REVEAL_ERRORS_ENV)? {
            pipeline.reveal_error_details = reveal;
        }

        Ok(Self {
            telegram_token,
            model,
            pipeline,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .ok_or_else(|| PipelineError::Configuration(format!("{} environment variable not set", key)))
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                PipelineError::Configuration(format!("invalid value for {}: {:?} ({})", key, raw, e))
            })
        })
        .transpose()
}
