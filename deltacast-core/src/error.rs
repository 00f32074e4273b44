//! Error taxonomy for deltacast.
//!
//! One enum covers every failure class the streaming core can surface:
//! pre-stream failures (connection, configuration), mid-stream transport and
//! protocol failures, cooperative cancellation, and retry exhaustion. A
//! stream yields either an event or one of these errors per step, never both,
//! and nothing downstream silently swallows them.

use thiserror::Error;

/// The error type for all deltacast operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to establish or authenticate the outbound connection.
    ///
    /// Pre-stream: returned directly from the stream-opening call, before any
    /// stream value exists.
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid client or interceptor configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Read failure on an open connection mid-stream. Terminal.
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload failed to parse as the expected provider envelope. Terminal.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The provider reported an error frame mid-stream. Terminal.
    #[error("provider error: {message}")]
    Provider {
        /// The provider's error message, verbatim.
        message: String,
    },

    /// The caller's cancellation fired. Terminal, cooperative.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed. Terminal, cooperative.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Every retry attempt failed; wraps the last underlying failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// The failure from the final attempt.
        #[source]
        source: Box<ClientError>,
    },

    /// JSON serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// Status-code substrings treated as transient by the default retry predicate.
const TRANSIENT_MARKERS: &[&str] = &["429", "500", "502", "503", "504", "529"];

impl ClientError {
    /// Create a transport error from any displayable read failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a protocol error for a malformed payload.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a provider-reported error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Whether this error came from cooperative cancellation or a deadline.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Default retryability predicate.
    ///
    /// Transient failures are detected by status-code substring match on the
    /// error text. Cancellation and retry exhaustion are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled | Self::DeadlineExceeded | Self::RetriesExhausted { .. } => false,
            Self::Configuration(_) | Self::Serialization(_) => false,
            other => {
                let text = other.to_string();
                TRANSIENT_MARKERS.iter().any(|code| text.contains(code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_detection() {
        assert!(ClientError::provider("429 rate limited").is_retryable());
        assert!(ClientError::transport("HTTP 503 service unavailable").is_retryable());
        assert!(!ClientError::provider("400 bad request").is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(ClientError::Cancelled.is_cancellation());
        assert!(ClientError::DeadlineExceeded.is_cancellation());
        assert!(!ClientError::transport("reset").is_cancellation());
    }

    #[test]
    fn test_retries_exhausted_preserves_source() {
        let err = ClientError::RetriesExhausted {
            attempts: 4,
            source: Box::new(ClientError::provider("529 overloaded")),
        };
        assert!(err.to_string().contains("4 attempts"));
        assert!(err.to_string().contains("overloaded"));
        assert!(!err.is_retryable());

        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("529"));
    }
}
