//! Command and message handlers for the Telegram bot.

use std::sync::Arc;

use review_core::{Egress, OutboundMessage, ReviewRequest};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::commands::{html_escape, parse_review_args, Command};
use crate::egress::TelegramEgress;
use crate::state::{format_uptime, BotState};

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> ResponseResult<()> {
    let welcome = "Здравствуйте! Я помогаю отвечать на отзывы клиентов автосервиса.\n\n\
        <b>Как пользоваться:</b>\n\
        1. Просто пришлите текст отзыва сообщением\n\
        2. Или используйте <code>/review [1-5] текст</code>, чтобы указать оценку\n\
        3. При оценке 1 или 2 я дополнительно подготовлю черновик жалобы\n\n\
        Type /help for all commands.";

    bot.send_message(msg.chat.id, welcome)
        .parse_mode(ParseMode::Html)
        .await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the /review command.
pub async fn handle_review(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    args: String,
) -> ResponseResult<()> {
    let parsed = match parse_review_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(chat_id = %msg.chat.id, error = %e, "Rejected /review arguments");
            bot.send_message(
                msg.chat.id,
                "Please provide the review text.\n\n\
                <b>Usage:</b> <code>/review [1-5] &lt;text&gt;</code>\n\n\
                Example: <code>/review 1 Плохое обслуживание</code>",
            )
            .parse_mode(ParseMode::Html)
            .await?;
            return Ok(());
        }
    };

    let mut request = ReviewRequest::new(msg.chat.id.0, parsed.text);
    if let Some(rating) = parsed.rating {
        request = request.with_rating(rating);
    }

    run_review(bot, &msg, &state, request).await
}

/// Handle regular text messages (reviews without a rating).
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let request = ReviewRequest::new(msg.chat.id.0, text);
    run_review(bot, &msg, &state, request).await
}

/// Run the pipeline for one request and deliver the reply.
async fn run_review(
    bot: Bot,
    msg: &Message,
    state: &BotState,
    request: ReviewRequest,
) -> ResponseResult<()> {
    // Typing indicator is cosmetic; its failure must not block the reply.
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let egress = TelegramEgress::new(bot);
    let outcome = state.service().process(&request, &egress).await;

    if let Some(kind) = outcome.error_kind() {
        warn!(chat_id = %msg.chat.id, kind = %kind, "Review answered with error message");
    }
    Ok(())
}

/// Handle the /id command - identity lookup.
pub async fn handle_id(bot: Bot, msg: Message) -> ResponseResult<()> {
    let mut text = format!("<b>Chat ID:</b> <code>{}</code>", msg.chat.id);

    if let Some(user) = msg.from.as_ref() {
        text.push_str(&format!("\n<b>User ID:</b> <code>{}</code>", user.id));
        if let Some(username) = user.username.as_deref() {
            text.push_str(&format!("\n<b>Username:</b> @{}", html_escape(username)));
        }
    }

    deliver_rich(bot, OutboundMessage::rich(msg.chat.id.0, text)).await
}

/// Handle the /ping command - liveness check.
pub async fn handle_ping(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let text = format!(
        "<b>pong</b>\nUptime: <code>{}</code>",
        format_uptime(state.uptime())
    );
    deliver_rich(bot, OutboundMessage::rich(msg.chat.id.0, text)).await
}

async fn deliver_rich(bot: Bot, message: OutboundMessage) -> ResponseResult<()> {
    let chat_id = message.chat_id;
    if let Err(e) = TelegramEgress::new(bot).deliver(message).await {
        warn!(chat_id, error = %e, "Failed to send reply");
    }
    Ok(())
}

/// Reply to an unrecognized `/command` without forwarding it to the model.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        info!(cmd = %text, "Unrecognized command - sending response");
        let name = text.split_whitespace().next().unwrap_or(text);
        bot.send_message(
            msg.chat.id,
            format!("Unknown command: {}\n\nUse /help to see available commands.", name),
        )
        .await?;
    }
    Ok(())
}

/// Dispatch commands to appropriate handlers.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Review(args) => handle_review(bot, msg, state, args).await,
        Command::Id => handle_id(bot, msg).await,
        Command::Ping => handle_ping(bot, msg, state).await,
    }
}

/// True for texts that look like a `/command`.
pub fn is_command_text(text: &str) -> bool {
    text.starts_with('/')
}

/// False when the command token carries an `@mention` of a different bot.
///
/// In group chats `/start@otherbot` belongs to another bot and gets no reply.
pub fn is_addressed_to(text: &str, bot_username: &str) -> bool {
    let token = text.split_whitespace().next().unwrap_or(text);
    match token.split_once('@') {
        Some((_, mention)) => mention.eq_ignore_ascii_case(bot_username),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::utils::command::ParseError;

    #[test]
    fn test_command_text_detection() {
        assert!(is_command_text("/review 1 Плохо"));
        assert!(is_command_text("/unknown"));
        assert!(!is_command_text("Плохое обслуживание /review"));
        assert!(!is_command_text(" /review"));
    }

    #[test]
    fn test_commands_for_other_bots_are_not_ours() {
        assert!(!is_addressed_to("/start@otherbot", "review_bot"));
        assert!(!is_addressed_to("/review@OtherBot 1 Плохо", "review_bot"));
        assert!(is_addressed_to("/unknown@Review_Bot", "review_bot"));
        assert!(is_addressed_to("/unknown", "review_bot"));
        assert!(is_addressed_to("/unknown text@otherbot", "review_bot"));
    }

    #[test]
    fn test_other_bot_mention_matches_command_parser() {
        // Such texts fall through the command filter, so the unknown-command
        // branch must skip them too.
        let text = "/start@otherbot";
        assert!(matches!(
            Command::parse(text, "review_bot"),
            Err(ParseError::WrongBotName(_))
        ));
        assert!(is_command_text(text) && !is_addressed_to(text, "review_bot"));

        assert_eq!(Command::parse("/start@review_bot", "review_bot").unwrap(), Command::Start);
        assert!(is_addressed_to("/start@review_bot", "review_bot"));
    }
}
