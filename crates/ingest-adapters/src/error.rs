//! Error classification for the three HTTP adapters.
//!
//! The adapter layer is the sole authority on transient vs. permanent: it
//! inspects the transport result and status code once, classifies, and
//! everything downstream (retry loop, orchestrator) just matches on the
//! variant without re-inspecting the HTTP details.

use thiserror::Error;

/// An error from a single adapter call, already classified for retry.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport failure, HTTP 5xx, or HTTP 429 — worth retrying.
    #[error("transient upstream error: {0}")]
    Transient(String),

    /// Any other 4xx, or a response body that failed to decode — retrying
    /// would not help.
    #[error("permanent upstream error: {0}")]
    Permanent(String),

    /// The caller's cancellation fired while the call (or its backoff
    /// wait) was in flight.
    #[error("cancelled")]
    Cancelled,
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        AdapterError::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        AdapterError::Permanent(msg.into())
    }

    /// Classifies a `reqwest` transport failure: timeouts and connect
    /// errors are transient, everything else (e.g. a malformed URL) is
    /// treated as permanent since retrying cannot fix it.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            AdapterError::transient(err.to_string())
        } else {
            AdapterError::permanent(err.to_string())
        }
    }

    /// Classifies an HTTP status per spec: 5xx and 429 are transient,
    /// every other non-2xx is permanent.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status.is_server_error() || status.as_u16() == 429 {
            AdapterError::transient(format!("{status}: {body}"))
        } else {
            AdapterError::permanent(format!("{status}: {body}"))
        }
    }
}
