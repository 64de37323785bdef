//! Error types shared by transports, listeners and the supervisor.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while a subscription is being opened or read.
///
/// Every variant is non-fatal from the point of view of a stream connection:
/// the connection reports it and re-opens the subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, TLS failure, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status.
    #[error("stream endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The endpoint asked us to slow down (HTTP 420 / 429).
    #[error("rate limited by stream endpoint (HTTP {code})")]
    RateLimited { code: u16 },

    /// No bytes arrived within the stall window.
    #[error("stream stalled: no data for {ms}ms")]
    Timeout { ms: u64 },

    /// The server closed the stream.
    #[error("stream closed by server")]
    Closed,

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the endpoint is throttling us.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` if re-opening the subscription may succeed without
    /// any change on our side.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code >= 500,
            Self::Http(_) | Self::Timeout { .. } | Self::Closed | Self::RateLimited { .. } => true,
            Self::Other(_) => false,
        }
    }
}

/// A single stream message could not be decoded. The message is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("deliverable message has no string `{field}` field")]
    MissingText { field: &'static str },
}

/// The hand-off lock was held past its maximum duration.
///
/// Never surfaced to callers; the supervisor force-expires the lock and
/// abandons the candidate connection when it sees this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hand-off lock held for {held:?}, limit is {limit:?}")]
pub struct LockTimeoutError {
    pub held: Duration,
    pub limit: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_classification() {
        let e = TransportError::RateLimited { code: 420 };
        assert!(e.is_rate_limited());
        assert!(e.is_retryable());
        assert!(!TransportError::Closed.is_rate_limited());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let unauthorized = TransportError::Status { code: 401, body: "Unauthorized".into() };
        assert!(!unauthorized.is_retryable());
        let unavailable = TransportError::Status { code: 503, body: String::new() };
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn lock_timeout_message() {
        let e = LockTimeoutError {
            held: Duration::from_secs(61),
            limit: Duration::from_secs(60),
        };
        assert_eq!(e.to_string(), "hand-off lock held for 61s, limit is 60s");
    }
}
