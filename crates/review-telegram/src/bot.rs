//! Composition root: wires the pipeline to Telegram and owns the dispatcher.

use std::sync::Arc;

use review_core::{ChatCompletionClient, ReviewPipeline, ReviewService, Settings};
use teloxide::dispatching::{DefaultKey, ShutdownToken, UpdateFilterExt};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::utils::command::BotCommands;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::commands::Command;
use crate::error::{Result, TelegramError};
use crate::handlers::{
    handle_command, handle_message, handle_unknown_command, is_addressed_to, is_command_text,
};
use crate::state::{create_shared_state, BotState};

/// The review responder bot.
pub struct ReviewBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl ReviewBot {
    /// Build the bot, the model client and the pipeline from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = ChatCompletionClient::new(&settings.model)?;
        let pipeline = ReviewPipeline::new(Arc::new(client), settings.pipeline.clone());
        Ok(Self::with_service(
            &settings.telegram_token,
            Arc::new(ReviewService::new(pipeline)),
        ))
    }

    /// Create a bot around an existing service (custom model backends).
    pub fn with_service(token: &str, service: Arc<ReviewService>) -> Self {
        Self {
            bot: Bot::new(token),
            state: create_shared_state(service),
        }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Run until Ctrl+C, then drain in-flight updates.
    pub async fn run(self) -> Result<()> {
        let running = self.spawn().await?;
        running.wait().await
    }

    /// Start dispatching in a background task.
    pub async fn spawn(self) -> Result<RunningBot> {
        info!("Starting review bot in polling mode...");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Could not register bot commands");
        }

        let mut dispatcher = self.build_dispatcher();
        let token = dispatcher.shutdown_token();
        let task = tokio::spawn(async move { dispatcher.dispatch().await });

        info!("Bot is running! Send a review to begin.");
        Ok(RunningBot { token, task })
    }

    fn build_dispatcher(&self) -> Dispatcher<Bot, teloxide::RequestError, DefaultKey> {
        let state_for_commands = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message, me: Me| {
                        msg.text()
                            .is_some_and(|t| is_command_text(t) && is_addressed_to(t, me.username()))
                    })
                    .endpoint(handle_unknown_command),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| !is_command_text(t)))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        info!(chat_id = %msg.chat.id, "Review message received");
                        async move { handle_message(bot, msg, state).await }
                    }),
            );

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.kind);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error occurred in a review handler",
            ))
            .enable_ctrlc_handler()
            .build()
    }
}

/// A dispatcher running in the background.
pub struct RunningBot {
    token: ShutdownToken,
    task: JoinHandle<()>,
}

impl RunningBot {
    /// Wait until the dispatcher exits (Ctrl+C or [`RunningBot::stop`]).
    pub async fn wait(self) -> Result<()> {
        self.task.await?;
        info!("Bot stopped");
        Ok(())
    }

    /// Stop accepting updates, let in-flight handlers finish, then return.
    pub async fn stop(self) -> Result<()> {
        info!("Stopping review bot...");
        match self.token.shutdown() {
            Ok(drained) => drained.await,
            // Dispatcher was not running yet or already stopped.
            Err(_idle) => {}
        }
        self.wait().await
    }
}
