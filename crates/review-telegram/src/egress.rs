//! Delivering replies to Telegram chats.

use async_trait::async_trait;
use review_core::{Egress, Formatting, OutboundMessage, PipelineError};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

/// Telegram's per-message text limit, in UTF-16 code units.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Sends [`OutboundMessage`]s through the Bot API.
#[derive(Clone)]
pub struct TelegramEgress {
    bot: Bot,
}

impl TelegramEgress {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Egress for TelegramEgress {
    async fn deliver(&self, message: OutboundMessage) -> review_core::Result<()> {
        let chat_id = ChatId(message.chat_id);
        let chunks = split_message(&message.text, TELEGRAM_MESSAGE_LIMIT);
        debug!(chat_id = message.chat_id, chunks = chunks.len(), "Delivering reply");

        for chunk in chunks {
            let mut req = self.bot.send_message(chat_id, chunk);
            if message.formatting == Formatting::RichText {
                req = req.parse_mode(ParseMode::Html);
            }
            req.await
                .map_err(|e| PipelineError::TransportFailure(e.to_string()))?;
        }
        Ok(())
    }
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Split text into chunks of at most `limit` UTF-16 units.
///
/// Breaks at line boundaries where possible and never inside a character.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if utf16_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        for ch in line.chars() {
            let width = ch.len_utf16();
            if current_len + width > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += width;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_message("Спасибо за отзыв!", 4096), vec!["Спасибо за отзыв!"]);
    }

    #[test]
    fn test_splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_long_line_is_split_by_chars() {
        let text = "ж".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_surrogate_pairs_count_double() {
        // Each emoji is two UTF-16 units.
        let text = "😀".repeat(5);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks, vec!["😀😀", "😀😀", "😀"]);
    }
}
