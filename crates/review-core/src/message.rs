//! Outbound replies handed to the chat egress.

use serde::{Deserialize, Serialize};

/// How the egress should render [`OutboundMessage::text`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatting {
    /// Send as-is, no markup parsing.
    #[default]
    Plain,
    /// Telegram HTML subset (bold, inline code).
    RichText,
}

/// A reply ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub formatting: Formatting,
}

impl OutboundMessage {
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            formatting: Formatting::Plain,
        }
    }

    pub fn rich(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            formatting: Formatting::RichText,
        }
    }
}
