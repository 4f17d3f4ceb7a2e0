//! Error taxonomy for the gateway transport.
//!
//! # Design Decisions
//! - Every failure mode of an attempt has its own variant; nothing is
//!   collapsed into a generic "request failed"
//! - Only connection errors, attempt timeouts and 408 responses are
//!   eligible for local recovery (see `is_retryable`)
//! - `ServiceUnavailable` is never produced by a transport, only by the
//!   retry orchestrator when a policy exhausts its schedule

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::http::RawResponse;

/// Boxed error used as the source of connection failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Sub-classification of connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    /// No pool slot became free within the acquire timeout.
    AcquireTimeout,
    /// The transport has been shut down.
    PoolClosed,
    /// TCP connect failed (refused, unreachable, connect timeout).
    Connect,
    /// TLS handshake failed.
    Tls,
    /// The HTTP proxy refused or broke the tunnel.
    Proxy,
    /// I/O error while the request or response was in transfer.
    Io,
}

impl ConnectionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionErrorKind::AcquireTimeout => "acquire_timeout",
            ConnectionErrorKind::PoolClosed => "pool_closed",
            ConnectionErrorKind::Connect => "connect",
            ConnectionErrorKind::Tls => "tls",
            ConnectionErrorKind::Proxy => "proxy",
            ConnectionErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the transport and the retry orchestrator.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Failed to acquire or establish a connection.
    #[error("Connection error ({kind}): {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
    },

    /// The attempt's bounded timeout elapsed before a response arrived.
    #[error("Attempt {attempt} timed out after {timeout:?}")]
    AttemptTimeout { attempt: usize, timeout: Duration },

    /// The server answered with 408 Request Timeout.
    #[error("Server returned 408 Request Timeout")]
    RequestTimeout { response: RawResponse },

    /// Malformed or unparsable response. Never retried.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Synthesized when a policy exhausts its schedule and is configured
    /// to report unavailability.
    #[error("Service unavailable after {attempts} attempts: {last}")]
    ServiceUnavailable {
        attempts: usize,
        #[source]
        last: Box<GatewayError>,
    },

    /// The caller cancelled the logical request.
    #[error("Request cancelled")]
    Cancelled,

    /// The caller-applied overall retry budget ran out.
    #[error("Retry time limit of {limit:?} exceeded")]
    RetryTimeLimitExceeded { limit: Duration },

    /// The logical request could not be turned into an HTTP request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The transport configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        GatewayError::Connection {
            kind,
            message: message.into(),
        }
    }

    /// True for the failure classes that a timeout policy may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection { .. }
                | GatewayError::AttemptTimeout { .. }
                | GatewayError::RequestTimeout { .. }
        )
    }

    /// Short label used for metrics and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::Connection { kind, .. } => kind.as_str(),
            GatewayError::AttemptTimeout { .. } => "attempt_timeout",
            GatewayError::RequestTimeout { .. } => "request_timeout_408",
            GatewayError::Protocol(_) => "protocol",
            GatewayError::ServiceUnavailable { .. } => "service_unavailable",
            GatewayError::Cancelled => "cancelled",
            GatewayError::RetryTimeLimitExceeded { .. } => "retry_time_limit",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        let acquire = GatewayError::connection(ConnectionErrorKind::AcquireTimeout, "pool");
        assert!(acquire.is_retryable());
        assert!(GatewayError::AttemptTimeout {
            attempt: 1,
            timeout: Duration::from_millis(500)
        }
        .is_retryable());
        assert!(GatewayError::RequestTimeout {
            response: RawResponse::from_status(http::StatusCode::REQUEST_TIMEOUT)
        }
        .is_retryable());

        assert!(!GatewayError::Protocol("bad status line".into()).is_retryable());
        assert!(!GatewayError::Cancelled.is_retryable());
        assert!(!GatewayError::ServiceUnavailable {
            attempts: 3,
            last: Box::new(GatewayError::Cancelled),
        }
        .is_retryable());
    }

    #[test]
    fn service_unavailable_exposes_last_failure_as_source() {
        use std::error::Error as _;

        let err = GatewayError::ServiceUnavailable {
            attempts: 3,
            last: Box::new(GatewayError::Protocol("eof".into())),
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Protocol error: eof"));
    }
}
