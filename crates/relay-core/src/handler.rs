//! The handler capability
//!
//! A handler looks at a request and either produces a [`Reply`], declines
//! with `Ok(None)` so the next candidate gets a turn, or fails.

use crate::{IntoResponse, Reply, Request, Result};
use std::sync::Arc;

/// Outcome of a single handler invocation
///
/// - `Ok(Some(reply))` ends dispatch with this reply
/// - `Ok(None)` declines the request
/// - `Err(e)` fails; see [`crate::Error::Respond`] for failures that carry a response
pub type HandlerResult = Result<Option<Reply>>;

/// Handler for requests
///
/// Handlers may be invoked any number of times, concurrently, across the
/// decline chain. They must not rely on being the one that answers.
pub trait Handler: Send + Sync {
    /// Handle the request
    fn handle(&self, request: &Request) -> HandlerResult;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, request: &Request) -> HandlerResult {
        (**self).handle(request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, request: &Request) -> HandlerResult {
        (**self).handle(request)
    }
}

/// Handler backed by a closure, see [`handler_fn`]
#[derive(Clone, Copy)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Request) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &Request) -> HandlerResult {
        (self.f)(request)
    }
}

/// Turn a closure into a [`Handler`]
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Request) -> HandlerResult + Send + Sync,
{
    HandlerFn { f }
}

/// Finish dispatch with `value`
pub fn respond(value: impl IntoResponse + Send + Sync + 'static) -> HandlerResult {
    Ok(Some(Reply::new(value)))
}

/// Let the next handler try
pub fn decline() -> HandlerResult {
    Ok(None)
}
