//! Error types for relay-core
//!
//! A failure is either *self-describing* ([`Error::Respond`], it carries the
//! response to send) or *opaque* (every other variant). Dispatch recovers the
//! former and propagates the latter.

use crate::into_response::{IntoResponse, Reply};
use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted from handler code
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for request dispatch
#[derive(Debug, Error)]
pub enum Error {
    /// Failure carrying its own response
    #[error("handler failed with a response")]
    Respond(Reply),

    /// Opaque failure raised by a handler
    #[error("handler error: {0}")]
    Handler(#[source] BoxError),

    /// Route pattern failed to compile
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Transport handed over something that is not a request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response head the transport cannot encode
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// IO error (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fail with a value that knows how to render itself.
    pub fn respond(value: impl IntoResponse + Send + Sync + 'static) -> Self {
        Error::Respond(Reply::new(value))
    }

    /// Fail with an opaque error.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Error::Handler(err.into())
    }

    /// Whether this failure can be turned into a response.
    pub fn is_response(&self) -> bool {
        matches!(self, Error::Respond(_))
    }

    /// Split off the response-bearing payload, handing back opaque errors untouched.
    pub fn into_reply(self) -> std::result::Result<Reply, Error> {
        match self {
            Error::Respond(reply) => Ok(reply),
            other => Err(other),
        }
    }
}
