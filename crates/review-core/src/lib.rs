//! Review Responder core - turns customer reviews into courteous replies.
//!
//! This crate holds everything that does not depend on a chat platform:
//!
//! - **request**: Inbound review requests and rating hints
//! - **prompt**: Fixed prompt template for automotive service reviews
//! - **client**: Chat completion client with timeout and backoff
//! - **pipeline**: Validate, compose, call the model, format the reply
//! - **service**: Pipeline plus delivery through an [`Egress`]
//! - **config**: Settings loaded from the environment
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use review_core::{ChatCompletionClient, ReviewPipeline, ReviewRequest, Settings};
//!
//! # async fn run() -> review_core::Result<()> {
//! let settings = Settings::from_env()?;
//! let client = ChatCompletionClient::new(&settings.model)?;
//! let pipeline = ReviewPipeline::new(Arc::new(client), settings.pipeline.clone());
//!
//! let request = ReviewRequest::new(42, "Плохое обслуживание").with_rating(1);
//! let outcome = pipeline.handle_review(&request).await;
//! println!("{}", outcome.message.text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod service;

pub use client::{ChatCompletionClient, ChatMessage, ModelService, RetryPolicy};
pub use config::{ModelSettings, PipelineSettings, Settings};
pub use error::{ErrorKind, PipelineError, Result};
pub use message::{Formatting, OutboundMessage};
pub use pipeline::{CompletionResult, ReviewOutcome, ReviewPipeline, ERROR_PREFIX};
pub use prompt::{compose, CompletionPrompt};
pub use request::ReviewRequest;
pub use service::{Egress, ReviewService, SharedReviewService};
