//! relay-core: request dispatch over ordered handlers
//!
//! The transport parses a [`Request`]; a [`DelegatingHandler`] tries its
//! handlers in order, usually [`RouteHandler`]s matching method and path,
//! and the first [`Reply`] becomes the [`Response`].
//!
//! ## Features
//! - `native` - hyper/tokio adapter that serves any [`Handler`]

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod delegating;
pub mod error;
pub mod handler;
pub mod into_response;
pub mod request;
pub mod response;
pub mod route;
pub mod uri;

#[cfg(feature = "native")]
pub mod server;

// Re-exports
pub use delegating::{DelegatingHandler, DelegatingHandlerBuilder};
pub use error::{BoxError, Error, Result};
pub use handler::{decline, handler_fn, respond, Handler, HandlerFn, HandlerResult};
pub use into_response::{HttpError, IntoResponse, Reply};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use route::{MatchHandler, RouteHandler, RouteMatch, RoutePattern};

#[cfg(feature = "native")]
pub use server::{create_optimized_socket, from_hyper_request, respond_to, serve, to_hyper_response, ServerConfig};
