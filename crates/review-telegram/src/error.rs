//! Error types for the Telegram bot.

use review_core::PipelineError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Missing or invalid settings. Fatal at startup.
    #[error("{0}")]
    Config(#[from] PipelineError),

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// The dispatcher task ended abnormally.
    #[error("Dispatcher task failed: {0}")]
    Dispatcher(String),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<tokio::task::JoinError> for TelegramError {
    fn from(e: tokio::task::JoinError) -> Self {
        TelegramError::Dispatcher(e.to_string())
    }
}
