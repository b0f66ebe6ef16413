//! Shared state for the Telegram bot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use review_core::{ReviewService, SharedReviewService};

/// Read-only state shared by all handlers.
///
/// Nothing here is mutated after startup, so concurrent chats never
/// contend on a lock.
pub struct BotState {
    service: SharedReviewService,
    started_at: Instant,
}

impl BotState {
    pub fn new(service: SharedReviewService) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }

    pub fn service(&self) -> &ReviewService {
        &self.service
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Create a new shared state wrapped in Arc.
pub fn create_shared_state(service: SharedReviewService) -> Arc<BotState> {
    Arc::new(BotState::new(service))
}

/// Render an uptime as `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes, seconds) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
