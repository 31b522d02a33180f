//! NetBox client errors.
//!
//! The variants separate the transport-level failure taxonomy the engine
//! needs to act on differently: transient errors are retried, permanent
//! 4xx responses are logged and abandon only the one request, and
//! [`NetBoxError::Fatal`] aborts the run (403, 5xx, a missing
//! `API-Version` header, or a retry budget exhausted).

use thiserror::Error;

/// Errors that can occur when interacting with the NetBox API.
#[derive(Debug, Error)]
pub enum NetBoxError {
    /// Transport-level failure (connection reset, timeout, DNS, TLS). Retried
    /// up to the configured `max_retry_attempts` before becoming [`Self::Fatal`].
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-auth 4xx response. The specific request is abandoned; the run continues.
    #[error("NetBox API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 404 from NetBox.
    #[error("not found: {0}")]
    NotFound(String),

    /// Cache file I/O failure.
    #[error("cache I/O error: {0}")]
    Cache(#[from] std::io::Error),

    /// Unrecoverable: 403, 5xx, missing `API-Version` header, or retry budget
    /// exhausted. The caller must abort the run with a non-zero exit.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl NetBoxError {
    /// True for connection-level failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request())
    }
}
