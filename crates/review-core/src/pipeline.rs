//! The review response pipeline.
//!
//! `Received -> Validated -> PromptComposed -> AwaitingModel ->
//! {Completed | Failed}`. Every path ends in exactly one
//! [`OutboundMessage`]; failures never escape as `Err`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::ModelService;
use crate::config::PipelineSettings;
use crate::error::{ErrorKind, PipelineError};
use crate::message::OutboundMessage;
use crate::prompt;
use crate::request::{is_valid_rating, ReviewRequest, MAX_RATING, MIN_RATING};

/// Prefix for every failure reply.
pub const ERROR_PREFIX: &str = "Error: ";

/// Result of the remote-call step, one per request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// First completion choice's text.
    Completed(String),
    /// Why no completion was produced.
    Failed(PipelineError),
}

impl CompletionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl From<crate::error::Result<String>> for CompletionResult {
    fn from(result: crate::error::Result<String>) -> Self {
        match result {
            Ok(text) => Self::Completed(text),
            Err(e) => Self::Failed(e),
        }
    }
}

/// What the pipeline hands back: always a message, plus the failure if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub message: OutboundMessage,
    pub error: Option<PipelineError>,
}

impl ReviewOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(PipelineError::kind)
    }
}

/// Turns review text into a reply through a [`ModelService`].
///
/// Holds no mutable state, so one instance serves all chats concurrently.
#[derive(Clone)]
pub struct ReviewPipeline {
    service: Arc<dyn ModelService>,
    settings: PipelineSettings,
}

impl ReviewPipeline {
    pub fn new(service: Arc<dyn ModelService>, settings: PipelineSettings) -> Self {
        Self { service, settings }
    }

    /// Pipeline with default settings.
    pub fn with_service(service: Arc<dyn ModelService>) -> Self {
        Self::new(service, PipelineSettings::default())
    }

    /// Answer one review.
    pub async fn handle_review(&self, request: &ReviewRequest) -> ReviewOutcome {
        let chat_id = request.chat_id;
        debug!(chat_id, rating = ?request.rating_hint, "Review received");

        if let Err(e) = self.validate(request) {
            info!(chat_id, error = %e, "Review rejected");
            return self.failure(chat_id, e);
        }
        debug!(chat_id, "Review validated");

        let prompt = prompt::compose(request);
        debug!(chat_id, complaint = prompt.requests_complaint(), "Prompt composed");

        debug!(chat_id, "Awaiting model");
        let result = CompletionResult::from(self.service.complete(&prompt).await);

        match result {
            CompletionResult::Completed(text) => {
                info!(chat_id, chars = text.chars().count(), "Review completed");
                ReviewOutcome {
                    message: OutboundMessage::plain(chat_id, text),
                    error: None,
                }
            }
            CompletionResult::Failed(e) => {
                warn!(chat_id, kind = %e.kind(), error = %e, "Review failed");
                self.failure(chat_id, e)
            }
        }
    }

    fn validate(&self, request: &ReviewRequest) -> Result<(), PipelineError> {
        if request.raw_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("review text is empty".into()));
        }

        let chars = request.raw_text.chars().count();
        if chars > self.settings.max_review_chars {
            return Err(PipelineError::InvalidInput(format!(
                "review text is too long ({} chars, max {})",
                chars, self.settings.max_review_chars
            )));
        }

        if let Some(rating) = request.rating_hint {
            if !is_valid_rating(rating) {
                return Err(PipelineError::InvalidInput(format!(
                    "rating must be between {} and {}, got {}",
                    MIN_RATING, MAX_RATING, rating
                )));
            }
        }

        Ok(())
    }

    fn failure(&self, chat_id: i64, error: PipelineError) -> ReviewOutcome {
        let text = format!("{}{}", ERROR_PREFIX, self.user_detail(&error));
        ReviewOutcome {
            message: OutboundMessage::plain(chat_id, text),
            error: Some(error),
        }
    }

    fn user_detail<'a>(&self, error: &'a PipelineError) -> &'a str {
        if self.settings.reveal_error_details || error.kind() == ErrorKind::InvalidInput {
            return error.detail();
        }
        match error.kind() {
            ErrorKind::TransportFailure => "the model service did not respond, please try again later",
            ErrorKind::RateLimited => "too many requests, please try again in a minute",
            _ => "the model service returned an unexpected response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::CompletionPrompt;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed result and counts calls.
    struct StubService {
        reply: crate::error::Result<String>,
        calls: AtomicUsize,
    }

    impl StubService {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: PipelineError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelService for StubService {
        async fn complete(&self, _prompt: &CompletionPrompt) -> crate::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    /// Answers with the review it was given.
    struct EchoService;

    #[async_trait]
    impl ModelService for EchoService {
        async fn complete(&self, prompt: &CompletionPrompt) -> crate::error::Result<String> {
            Ok(format!("Ответ на отзыв: {}", prompt.review))
        }
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_model_call() {
        let stub = StubService::replying("unused");
        let pipeline = ReviewPipeline::with_service(stub.clone());

        for text in ["", "   \n\t"] {
            let outcome = pipeline.handle_review(&ReviewRequest::new(5, text)).await;
            assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidInput));
            assert_eq!(outcome.message.chat_id, 5);
            assert_eq!(outcome.message.text, "Error: review text is empty");
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_invalid() {
        let stub = StubService::replying("unused");
        let pipeline = ReviewPipeline::with_service(stub.clone());

        let outcome = pipeline
            .handle_review(&ReviewRequest::new(1, "Нормально").with_rating(9))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_overlong_text_is_invalid() {
        let stub = StubService::replying("unused");
        let settings = PipelineSettings {
            max_review_chars: 10,
            ..PipelineSettings::default()
        };
        let pipeline = ReviewPipeline::new(stub.clone(), settings);

        let outcome = pipeline
            .handle_review(&ReviewRequest::new(1, "ё".repeat(11)))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(stub.calls(), 0);

        let outcome = pipeline.handle_review(&ReviewRequest::new(1, "ё".repeat(10))).await;
        assert!(outcome.is_success());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_negative_review_scenario() {
        let stub = StubService::replying("Reply + complaint draft");
        let pipeline = ReviewPipeline::with_service(stub.clone());

        let request = ReviewRequest::new(42, "Плохое обслуживание").with_rating(1);
        let outcome = pipeline.handle_review(&request).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.message, OutboundMessage::plain(42, "Reply + complaint draft"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_scenario() {
        let stub = StubService::failing(PipelineError::upstream(500, "server error"));
        let pipeline = ReviewPipeline::with_service(stub.clone());

        let outcome = pipeline.handle_review(&ReviewRequest::new(1, "Всё ок")).await;
        assert_eq!(outcome.message.text, "Error: server error");
        assert_eq!(outcome.error_kind(), Some(ErrorKind::UpstreamError));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_message() {
        let stub = StubService::failing(PipelineError::TransportFailure("request timed out".into()));
        let pipeline = ReviewPipeline::with_service(stub);

        let outcome = pipeline.handle_review(&ReviewRequest::new(1, "Долго")).await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::TransportFailure));
        assert_eq!(outcome.message.text, "Error: request timed out");
    }

    #[tokio::test]
    async fn test_hidden_error_details() {
        let settings = PipelineSettings {
            reveal_error_details: false,
            ..PipelineSettings::default()
        };
        let stub = StubService::failing(PipelineError::upstream(500, "stack trace at line 42"));
        let pipeline = ReviewPipeline::new(stub, settings.clone());

        let outcome = pipeline.handle_review(&ReviewRequest::new(1, "Всё ок")).await;
        assert!(outcome.message.text.starts_with(ERROR_PREFIX));
        assert!(!outcome.message.text.contains("stack trace"));

        // Input problems are the user's to fix, so they stay visible.
        let pipeline = ReviewPipeline::new(StubService::replying("unused"), settings);
        let outcome = pipeline.handle_review(&ReviewRequest::new(1, "")).await;
        assert_eq!(outcome.message.text, "Error: review text is empty");
    }

    #[tokio::test]
    async fn test_echo_round_trip_keeps_text_verbatim() {
        let pipeline = ReviewPipeline::with_service(Arc::new(EchoService));
        let text = "Сказали \"готово\", а колесо 'болтается' <b>!</b> \\ `код`";

        let outcome = pipeline.handle_review(&ReviewRequest::new(3, text)).await;
        assert!(outcome.message.text.contains(text));
    }

    #[tokio::test]
    async fn test_identical_input_is_idempotent() {
        let pipeline = ReviewPipeline::with_service(Arc::new(EchoService));
        let request = ReviewRequest::new(3, "Машину вернули грязной").with_rating(2);

        let first = pipeline.handle_review(&request).await;
        let second = pipeline.handle_review(&request).await;
        assert_eq!(first.message.text, second.message.text);
    }

    #[test]
    fn test_completion_result_from_result() {
        assert!(CompletionResult::from(Ok("text".to_string())).is_success());
        let failed = CompletionResult::from(Err(PipelineError::RateLimited("slow".into())));
        assert!(!failed.is_success());
    }

    mod http {
        use super::*;
        use crate::client::{ChatCompletionClient, RetryPolicy};
        use crate::config::ModelSettings;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn pipeline_for(server: &MockServer, timeout: Duration) -> ReviewPipeline {
            let settings = ModelSettings::new("sk-test")
                .with_base_url(server.uri())
                .with_timeout(timeout);
            let client = ChatCompletionClient::new(&settings)
                .unwrap()
                .with_retry(RetryPolicy::none());
            ReviewPipeline::with_service(Arc::new(client))
        }

        #[tokio::test]
        async fn test_server_error_becomes_error_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
                .expect(1)
                .mount(&server)
                .await;

            let pipeline = pipeline_for(&server, Duration::from_secs(2));
            let outcome = pipeline
                .handle_review(&ReviewRequest::new(42, "Плохое обслуживание").with_rating(1))
                .await;

            assert_eq!(outcome.message, OutboundMessage::plain(42, "Error: server error"));
            assert_eq!(outcome.error_kind(), Some(ErrorKind::UpstreamError));
        }

        #[tokio::test]
        async fn test_slow_model_becomes_transport_failure_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_delay(Duration::from_secs(5))
                        .set_body_string(r#"{"choices":[{"message":{"content":"late"}}]}"#),
                )
                .mount(&server)
                .await;

            let pipeline = pipeline_for(&server, Duration::from_millis(200));
            let outcome = pipeline.handle_review(&ReviewRequest::new(42, "Долго чинили")).await;

            assert_eq!(outcome.error_kind(), Some(ErrorKind::TransportFailure));
            assert_eq!(outcome.message.chat_id, 42);
            assert!(outcome.message.text.starts_with(ERROR_PREFIX));
        }

        #[tokio::test]
        async fn test_completion_passes_through_as_plain_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(r#"{"choices":[{"message":{"content":"Спасибо за отзыв!"}}]}"#),
                )
                .mount(&server)
                .await;

            let pipeline = pipeline_for(&server, Duration::from_secs(2));
            let outcome = pipeline.handle_review(&ReviewRequest::new(7, "Всё отлично")).await;

            assert!(outcome.is_success());
            assert_eq!(outcome.message, OutboundMessage::plain(7, "Спасибо за отзыв!"));
        }
    }
}
