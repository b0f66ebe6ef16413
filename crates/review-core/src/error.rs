//! Error types for the review pipeline.

use thiserror::Error;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before reaching the model service.
    InvalidInput,
    /// Network-level failure (timeout, DNS, connection reset).
    TransportFailure,
    /// The model service answered, but not with a usable completion.
    UpstreamError,
    /// The model service refused the call because of its rate limit.
    RateLimited,
    /// Required configuration is missing or malformed.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::TransportFailure => write!(f, "transport_failure"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Errors that can occur while turning a review into a reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Empty or malformed review request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Request never got a response (timeout, DNS, connection reset).
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Non-success status or unusable payload from the model service.
    #[error("upstream error{}: {detail}", status_suffix(.status))]
    UpstreamError {
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Raw response body or parse error.
        detail: String,
    },

    /// HTTP 429 from the model service.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Missing credentials or malformed settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// Build an upstream error carrying an HTTP status.
    pub fn upstream(status: u16, detail: impl Into<String>) -> Self {
        Self::UpstreamError {
            status: Some(status),
            detail: detail.into(),
        }
    }

    /// Build an upstream error for a response that could not be interpreted.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::UpstreamError {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::TransportFailure(_) => ErrorKind::TransportFailure,
            Self::UpstreamError { .. } => ErrorKind::UpstreamError,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The bare detail, without the kind prefix used by `Display`.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidInput(d)
            | Self::TransportFailure(d)
            | Self::RateLimited(d)
            | Self::Configuration(d) => d,
            Self::UpstreamError { detail, .. } => detail,
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PipelineError::malformed(e.to_string())
        } else if e.is_timeout() {
            PipelineError::TransportFailure(format!("request timed out: {}", e))
        } else {
            PipelineError::TransportFailure(e.to_string())
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::InvalidInput("review text is empty".into());
        assert_eq!(err.to_string(), "invalid input: review text is empty");

        let err = PipelineError::upstream(500, "server error");
        assert_eq!(err.to_string(), "upstream error (500): server error");

        let err = PipelineError::malformed("missing field `choices`");
        assert_eq!(err.to_string(), "upstream error: missing field `choices`");
    }

    #[test]
    fn test_detail_strips_prefix() {
        assert_eq!(PipelineError::upstream(500, "server error").detail(), "server error");
        assert_eq!(
            PipelineError::TransportFailure("operation timed out".into()).detail(),
            "operation timed out"
        );
    }

    #[test]
    fn test_kind_and_retryable() {
        let err = PipelineError::TransportFailure("connection reset".into());
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert!(err.is_retryable());

        let err = PipelineError::RateLimited("slow down".into());
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(!err.is_retryable());

        assert!(!PipelineError::upstream(502, "bad gateway").is_retryable());
        assert_eq!(ErrorKind::UpstreamError.to_string(), "upstream_error");
    }
}
