//! Inbound review requests.

use serde::{Deserialize, Serialize};

/// Lowest accepted rating hint.
pub const MIN_RATING: u8 = 1;

/// Highest accepted rating hint.
pub const MAX_RATING: u8 = 5;

/// Ratings at or below this value get a complaint draft.
pub const NEGATIVE_RATING_THRESHOLD: u8 = 2;

/// One review to answer, created per inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Review text exactly as the customer sent it.
    pub raw_text: String,
    /// Chat the reply goes back to.
    pub chat_id: i64,
    /// Optional 1-5 rating supplied by the user.
    pub rating_hint: Option<u8>,
}

impl ReviewRequest {
    /// Create a request without a rating hint.
    pub fn new(chat_id: i64, raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            chat_id,
            rating_hint: None,
        }
    }

    /// Attach a rating hint.
    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating_hint = Some(rating);
        self
    }

    /// True when the rating hint asks for a complaint draft (1 or 2).
    pub fn is_negative(&self) -> bool {
        self.rating_hint
            .is_some_and(|r| (MIN_RATING..=NEGATIVE_RATING_THRESHOLD).contains(&r))
    }
}

/// Check that a rating is within 1-5.
pub fn is_valid_rating(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
