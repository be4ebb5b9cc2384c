//! Ordered fallthrough dispatch
//!
//! A [`DelegatingHandler`] tries its handlers in construction order. The
//! first reply wins, a self-describing failure is recovered into a reply,
//! any other failure propagates, and when everyone declines the configured
//! default is used.

use crate::{Error, Handler, HandlerResult, IntoResponse, Reply, Request, Response, Result};
use std::fmt;
use std::sync::Arc;

type Fallback = Box<dyn Fn() -> Reply + Send + Sync>;

/// Handler that delegates to a list of handlers, in order
pub struct DelegatingHandler {
    handlers: Box<[Arc<dyn Handler>]>,
    not_handled: Fallback,
}

impl DelegatingHandler {
    /// Create a dispatcher over `handlers`, tried in iteration order.
    ///
    /// The list is copied; `not_handled` is cloned for every request no
    /// handler answers.
    pub fn new<I, R>(handlers: I, not_handled: R) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
        R: IntoResponse + Clone + Send + Sync + 'static,
    {
        Self {
            handlers: handlers.into_iter().collect(),
            not_handled: Box::new(move || Reply::new(not_handled.clone())),
        }
    }

    /// Start building a dispatcher one handler at a time
    pub fn builder() -> DelegatingHandlerBuilder {
        DelegatingHandlerBuilder::default()
    }

    /// Number of delegates
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch and resolve the reply into the final response.
    ///
    /// Only opaque failures come back as `Err`.
    pub fn dispatch(&self, request: &Request) -> Result<Response> {
        let reply = self.resolve(request)?;
        Ok(reply.into_response())
    }

    fn resolve(&self, request: &Request) -> Result<Reply> {
        for (index, handler) in self.handlers.iter().enumerate() {
            match handler.handle(request) {
                Ok(Some(reply)) => {
                    tracing::trace!(index, method = %request.method, uri = %request.uri, "handler answered");
                    return Ok(reply);
                }
                Ok(None) => continue,
                Err(Error::Respond(reply)) => {
                    tracing::trace!(index, method = %request.method, uri = %request.uri, "handler failed with a response");
                    return Ok(reply);
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(method = %request.method, uri = %request.uri, "no handler answered, using default");
        Ok((self.not_handled)())
    }
}

impl Handler for DelegatingHandler {
    fn handle(&self, request: &Request) -> HandlerResult {
        self.resolve(request).map(Some)
    }
}

impl fmt::Debug for DelegatingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingHandler")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`DelegatingHandler`]
#[derive(Default)]
pub struct DelegatingHandlerBuilder {
    handlers: Vec<Arc<dyn Handler>>,
}

impl DelegatingHandlerBuilder {
    /// Append a handler; earlier handlers are tried first
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already shared handler
    pub fn shared(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Finish with the response used when no handler answers
    pub fn build<R>(self, not_handled: R) -> DelegatingHandler
    where
        R: IntoResponse + Clone + Send + Sync + 'static,
    {
        DelegatingHandler::new(self.handlers, not_handled)
    }
}
