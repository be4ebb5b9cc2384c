//! Conversion into the final [`Response`]
//!
//! Anything a handler produces, and any failure that knows how to render
//! itself, implements [`IntoResponse`]. Conversion consumes the value: treat
//! it as terminal, like closing a resource.

use crate::{Error, Response, ResponseBuilder, StatusCode};
use bytes::Bytes;
use std::fmt;

/// Something which can be converted into a [`Response`]
pub trait IntoResponse {
    /// Convert into a response. Called at most once per value.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(Bytes::from_static(self.as_bytes()))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl<B: Into<Bytes>> IntoResponse for (StatusCode, B) {
    fn into_response(self) -> Response {
        let (status, body) = self;
        ResponseBuilder::new(status)
            .header("content-type", "text/plain; charset=utf-8")
            .body(body)
            .build()
    }
}

/// Object-safe bridge so boxed values can be consumed
trait BoxedIntoResponse: Send + Sync {
    fn into_response_boxed(self: Box<Self>) -> Response;
}

impl<T: IntoResponse + Send + Sync> BoxedIntoResponse for T {
    fn into_response_boxed(self: Box<Self>) -> Response {
        (*self).into_response()
    }
}

/// Type-erased handler result
///
/// Holds any [`IntoResponse`] value until the transport asks for the response.
pub struct Reply {
    inner: Box<dyn BoxedIntoResponse>,
}

impl Reply {
    /// Erase a value into a reply
    pub fn new(value: impl IntoResponse + Send + Sync + 'static) -> Self {
        Self {
            inner: Box::new(value),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        self.inner.into_response_boxed()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply(..)")
    }
}

impl From<Response> for Reply {
    fn from(res: Response) -> Self {
        Reply::new(res)
    }
}

/// Error that renders as a plain-text HTTP error page
///
/// Return it with `?` from deep handler code to short-circuit dispatch:
/// `From<HttpError> for Error` tags it as a self-describing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, StatusCode::NOT_FOUND.reason_phrase())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::respond(err)
    }
}
