//! Error type shared by every layer of the pipeline.
//!
//! A single [`Error`] flows through the whole stack so that middlewares can be
//! composed in any order without conversion glue. The variants follow the
//! lifecycle of a call:
//!
//! - **Build errors** ([`Error::Build`], [`Error::EmptyUrl`], [`Error::InvalidUrl`])
//!   are detected before any network traffic and are never retried.
//! - **Transport errors** ([`Error::Transport`]) come from the terminal executor
//!   and are retried by the retry layer.
//! - **Exhaustion errors** ([`Error::RetriesExhausted`],
//!   [`Error::StatusRetriesExhausted`]) are reported once every attempt failed.
//! - **Cancellation** ([`Error::Cancelled`]) takes precedence over retrying.
//!
//! # Examples
//!
//! ```
//! use tower_rest_core::Error;
//!
//! let err = Error::transport(std::io::Error::other("connection reset"));
//! assert!(err.is_transport());
//! assert_eq!(err.to_string(), "transport error: connection reset");
//! ```

use http::StatusCode;
use std::time::Duration;

/// Boxed error used for opaque causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while building, sending, or reading an HTTP call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be assembled (deferred construction failure,
    /// invalid header, invalid method or URI).
    #[error("failed to build request: {0}")]
    Build(#[source] BoxError),

    /// The request URL was empty.
    #[error("request URL is empty")]
    EmptyUrl,

    /// The request URL could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: BoxError,
    },

    /// The terminal executor failed to complete the exchange.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Reading a request or response body failed.
    #[error("failed to read body: {0}")]
    Body(#[source] std::io::Error),

    /// A read-fully operation was attempted on a response whose body was
    /// already consumed or closed.
    #[error("response body already consumed")]
    BodyConsumed,

    /// The call's cancellation token fired before the next attempt.
    #[error("request cancelled")]
    Cancelled,

    /// The call did not finish within the client timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Every attempt ended in a transport error.
    #[error("all {attempts} retry attempts failed: {source}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Error from the final attempt.
        #[source]
        source: Box<Error>,
    },

    /// Every attempt ended in a retryable status (5xx, or 429 with a
    /// `Retry-After` header).
    #[error("all {attempts} retry attempts exhausted, last status {status}")]
    StatusRetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Status of the final attempt.
        status: StatusCode,
    },

    /// A `Retry-After` header was neither delay-seconds nor an HTTP-date.
    #[error("invalid Retry-After header: {0}")]
    InvalidRetryAfter(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O failed (for example while saving a body to a file).
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// A dispatched task ended without producing a result.
    #[error("dispatched task was cancelled before producing a result")]
    TaskCancelled,
}

impl Error {
    /// Wraps an arbitrary error as a build failure.
    pub fn build<E: Into<BoxError>>(err: E) -> Self {
        Error::Build(err.into())
    }

    /// Wraps an arbitrary error as a transport failure.
    pub fn transport<E: Into<BoxError>>(err: E) -> Self {
        Error::Transport(err.into())
    }

    /// Returns `true` if the request never left the builder.
    pub fn is_build(&self) -> bool {
        matches!(
            self,
            Error::Build(_) | Error::EmptyUrl | Error::InvalidUrl { .. }
        )
    }

    /// Returns `true` for transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns `true` if the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns `true` if the client timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns `true` if the retry layer gave up.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Error::RetriesExhausted { .. } | Error::StatusRetriesExhausted { .. }
        )
    }

    /// Status of the final attempt, when retries were exhausted on status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::StatusRetriesExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }
}
