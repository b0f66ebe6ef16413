//! Prompt template for review replies.
//!
//! The instructions live in the system message and the review travels as
//! its own user message, byte for byte. JSON encoding of the request body is
//! the only quoting layer, so quotes, backticks and newlines in the review
//! reach the model unchanged.

use crate::client::ChatMessage;
use crate::request::ReviewRequest;

/// Base instruction for every review.
const REPLY_INSTRUCTION: &str = r#"Ты менеджер по работе с клиентами автосервиса.
Клиент оставил отзыв о нашем обслуживании. Напиши вежливый ответ на этот отзыв.

Правила:
- Поблагодари клиента за отзыв
- Отвечай по существу отзыва, не выдумывай факты
- Если клиент недоволен, извинись и предложи связаться с сервисом для решения вопроса
- Пиши на том же языке, что и отзыв
- Не более 5-6 предложений"#;

/// Extra instruction for ratings 1-2.
const COMPLAINT_INSTRUCTION: &str = r#"Дополнительно, после ответа, составь черновик жалобы от имени клиента,
пригодный для публикации на стороннем сайте отзывов. Отдели черновик от ответа
строкой "Черновик жалобы:". Черновик должен быть корректным, без оскорблений,
с конкретным описанием проблемы из отзыва."#;

/// A fully composed prompt, derived deterministically from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    /// Instructions for the model.
    pub system: String,
    /// The review text, verbatim.
    pub review: String,
}

impl CompletionPrompt {
    /// Chat messages in request order: system, then user.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system),
            ChatMessage::user(&self.review),
        ]
    }

    /// Whether the complaint draft instruction is included.
    pub fn requests_complaint(&self) -> bool {
        self.system.contains(COMPLAINT_INSTRUCTION)
    }
}

/// Build the prompt for a review request.
pub fn compose(request: &ReviewRequest) -> CompletionPrompt {
    let mut system = String::from(REPLY_INSTRUCTION);

    if let Some(rating) = request.rating_hint {
        system.push_str(&format!("\n\nОценка клиента: {} из 5.", rating));
    }
    if request.is_negative() {
        system.push_str("\n\n");
        system.push_str(COMPLAINT_INSTRUCTION);
    }

    CompletionPrompt {
        system,
        review: request.raw_text.clone(),
    }
}
