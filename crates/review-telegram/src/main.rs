//! Review Responder Telegram Bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx OPENROUTER_API_KEY=yyy cargo run -p review-telegram
//! ```

use std::time::Duration;

use clap::Parser;
use review_core::{config, Settings};
use review_telegram::ReviewBot;
use tracing_subscriber::EnvFilter;

/// Review Responder Bot - answer customer reviews from Telegram
#[derive(Parser, Debug)]
#[command(name = "review-telegram")]
#[command(about = "Telegram bot that drafts replies to customer reviews")]
struct Args {
    /// Model call budget in seconds, retries included (overrides REVIEW_TIMEOUT_SECS)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Hide raw model-service errors from chat users
    #[arg(long)]
    hide_errors: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "review_telegram=info,review_core=info,teloxide=warn",
        1 => "review_telegram=debug,review_core=debug,teloxide=info",
        2 => "review_telegram=trace,review_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Missing secrets are fatal: never run without them.
    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("{}\nPut secrets in {} or the environment.", e, env_path.display());
            return Err(e.into());
        }
    };

    if let Some(secs) = args.timeout {
        let secs = secs.clamp(config::MIN_TIMEOUT_SECS, config::MAX_TIMEOUT_SECS);
        settings.model.timeout = Duration::from_secs(secs);
    }
    if args.hide_errors {
        settings.pipeline.reveal_error_details = false;
    }
    tracing::debug!(?settings, "Settings loaded");

    let bot = ReviewBot::new(&settings)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, model = %settings.model.model, "Bot initialized successfully");
            println!("\nReview Responder Bot");
            println!("   Bot: @{}", username);
            println!("   Model: {}", settings.model.model);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\nSend a review to the bot in Telegram");
    println!("   Press Ctrl+C to stop\n");

    bot.run().await?;

    Ok(())
}
