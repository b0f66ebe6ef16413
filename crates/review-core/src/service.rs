//! Pipeline plus delivery: one inbound review in, one reply out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::message::OutboundMessage;
use crate::pipeline::{ReviewOutcome, ReviewPipeline};
use crate::request::ReviewRequest;

/// Delivers replies back to the originating chat.
#[async_trait]
pub trait Egress: Send + Sync {
    async fn deliver(&self, message: OutboundMessage) -> Result<()>;
}

/// Runs the pipeline for a request and hands the reply to the egress.
pub struct ReviewService {
    pipeline: ReviewPipeline,
}

impl ReviewService {
    pub fn new(pipeline: ReviewPipeline) -> Self {
        Self { pipeline }
    }

    /// Handle one review and deliver exactly one message.
    ///
    /// Delivery failures are logged, not returned: the chat loop must keep
    /// running whatever happens to a single reply. If this future is dropped
    /// before the model answers, nothing is delivered.
    pub async fn process(&self, request: &ReviewRequest, egress: &dyn Egress) -> ReviewOutcome {
        let outcome = self.pipeline.handle_review(request).await;

        match egress.deliver(outcome.message.clone()).await {
            Ok(()) => info!(chat_id = request.chat_id, success = outcome.is_success(), "Reply delivered"),
            Err(e) => warn!(chat_id = request.chat_id, error = %e, "Failed to deliver reply"),
        }

        outcome
    }
}

/// Shared handle used by chat handlers.
pub type SharedReviewService = Arc<ReviewService>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelService;
    use crate::error::PipelineError;
    use crate::prompt::CompletionPrompt;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingEgress {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl Egress for RecordingEgress {
        async fn deliver(&self, message: OutboundMessage) -> Result<()> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    struct BrokenEgress;

    #[async_trait]
    impl Egress for BrokenEgress {
        async fn deliver(&self, _message: OutboundMessage) -> Result<()> {
            Err(PipelineError::TransportFailure("chat unreachable".into()))
        }
    }

    struct FixedService(&'static str);

    #[async_trait]
    impl ModelService for FixedService {
        async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct SlowService;

    #[async_trait]
    impl ModelService for SlowService {
        async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    fn service_with(model: Arc<dyn ModelService>) -> ReviewService {
        ReviewService::new(ReviewPipeline::with_service(model))
    }

    #[tokio::test]
    async fn test_exactly_one_message_per_request() {
        let service = service_with(Arc::new(FixedService("Спасибо!")));
        let egress = RecordingEgress::default();

        for text in ["Отлично", "", "Плохо"] {
            service.process(&ReviewRequest::new(9, text), &egress).await;
        }

        let sent = egress.sent.lock().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].text, "Спасибо!");
        assert_eq!(sent[1].text, "Error: review text is empty");
        assert!(sent.iter().all(|m| m.chat_id == 9));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_escape() {
        let service = service_with(Arc::new(FixedService("Спасибо!")));
        let outcome = service.process(&ReviewRequest::new(1, "Отлично"), &BrokenEgress).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_cancelled_request_delivers_nothing() {
        let service = service_with(Arc::new(SlowService));
        let egress = RecordingEgress::default();

        let request = ReviewRequest::new(1, "Жду ответа");
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            service.process(&request, &egress),
        )
        .await;

        assert!(result.is_err());
        assert!(egress.sent.lock().await.is_empty());
    }
}
