//! Slash commands and their argument parsing.

use review_core::request::{MAX_RATING, MIN_RATING};
use teloxide::utils::command::BotCommands;
use thiserror::Error;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Answer a review: /review [1-5] <text>")]
    Review(String),

    #[command(description = "Show your chat and user IDs")]
    Id,

    #[command(description = "Check that the bot is alive")]
    Ping,
}

/// Parsed `/review` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewArgs {
    pub rating: Option<u8>,
    pub text: String,
}

/// Why `/review` arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewArgsError {
    #[error("review text is missing")]
    MissingText,
}

/// Parse `/review [rating] <text>`.
///
/// A leading standalone digit 1-5 is the rating; everything after it is
/// the review. Any other leading token is part of the review text.
pub fn parse_review_args(args: &str) -> Result<ReviewArgs, ReviewArgsError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(ReviewArgsError::MissingText);
    }

    let (first, rest) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (args, ""),
    };

    match parse_rating(first) {
        Some(_) if rest.is_empty() => Err(ReviewArgsError::MissingText),
        Some(rating) => Ok(ReviewArgs {
            rating: Some(rating),
            text: rest.to_string(),
        }),
        None => Ok(ReviewArgs {
            rating: None,
            text: args.to_string(),
        }),
    }
}

fn parse_rating(token: &str) -> Option<u8> {
    if token.len() != 1 {
        return None;
    }
    token
        .parse::<u8>()
        .ok()
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
}

/// Escape HTML special characters for Telegram HTML mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
