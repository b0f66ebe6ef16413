//! Telegram bot front end for the review responder.
//!
//! Customers' reviews arrive as chat messages, go through the
//! [`review_core::ReviewPipeline`], and the generated reply is sent back to
//! the same chat.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `OPENROUTER_API_KEY`: Model service credential
//!
//! See [`review_core::config`] for the optional ones.
//!
//! # Example
//!
//! ```no_run
//! use review_core::Settings;
//! use review_telegram::ReviewBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let bot = ReviewBot::new(&settings)?;
//!
//!     let running = bot.spawn().await?;
//!     // ... later, drain in-flight reviews and stop
//!     running.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message and usage
//! - `/help` - Show available commands
//! - `/review [1-5] <text>` - Answer a review, optionally with a rating
//! - `/id` - Show chat and user IDs
//! - `/ping` - Liveness check
//!
//! Any other text message is treated as a review without a rating.

pub mod bot;
pub mod commands;
pub mod egress;
pub mod error;
pub mod handlers;
pub mod state;

pub use bot::{ReviewBot, RunningBot};
pub use commands::{parse_review_args, Command, ReviewArgs, ReviewArgsError};
pub use egress::{split_message, TelegramEgress, TELEGRAM_MESSAGE_LIMIT};
pub use error::{Result, TelegramError};
pub use state::{create_shared_state, BotState};
