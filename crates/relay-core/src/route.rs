//! Single-route handlers
//!
//! A [`RouteHandler`] filters on the request method (case-insensitive) and
//! on a regular expression that must match the *whole* decoded path. Any
//! mismatch, including an unparsable request-target, declines so the next
//! handler in line can try.
//!
//! ## Example
//! ```
//! use relay_core::{respond, HttpError, Method, Request, RouteHandler, RoutePattern, Handler};
//!
//! let route = RouteHandler::get(RoutePattern::new(r"/users/(\d+)").unwrap(), |m, _req| {
//!     let id: u64 = m.get(1).unwrap_or("").parse().map_err(|_| HttpError::bad_request("id"))?;
//!     respond(format!("user {id}"))
//! });
//!
//! assert!(route.handle(&Request::new("GET", "/users/42?tab=posts")).unwrap().is_some());
//! assert!(route.handle(&Request::new("GET", "/users/42/extra")).unwrap().is_none());
//! assert!(route.handle(&Request::new(Method::Post, "/users/42")).unwrap().is_none());
//! ```

use crate::handler::respond;
use crate::{uri, Handler, HandlerResult, IntoResponse, Method, Request, Result};
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;

/// Regular expression matched against the full decoded path
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a pattern. The expression is implicitly anchored at both ends.
    pub fn new(expr: &str) -> Result<Self> {
        // Validate as written so the anchoring group cannot hide a syntax error
        Regex::new(expr)?;
        let regex = match Regex::new(&format!("^(?:{expr})$")) {
            Ok(regex) => regex,
            // A verbose-mode `#` comment ran to the end and swallowed the
            // closing anchor; end the comment with a newline first.
            Err(_) => Regex::new(&format!("^(?:{expr}\n)$"))?,
        };
        Ok(Self {
            source: expr.to_string(),
            regex,
        })
    }

    /// The expression as written by the caller
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Full-string match against `path`
    pub fn match_path<'p>(&self, path: &'p str) -> Option<RouteMatch<'p>> {
        self.regex.captures(path).map(|captures| RouteMatch { captures })
    }
}

impl FromStr for RoutePattern {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for RoutePattern {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutePattern").field(&self.source).finish()
    }
}

/// Successful match of a route pattern against a path
#[derive(Debug)]
pub struct RouteMatch<'p> {
    captures: Captures<'p>,
}

impl<'p> RouteMatch<'p> {
    /// The decoded path that matched
    pub fn path(&self) -> &'p str {
        self.get(0).unwrap_or("")
    }

    /// Capture group by index; 0 is the whole path
    pub fn get(&self, index: usize) -> Option<&'p str> {
        self.captures.get(index).map(|m| m.as_str())
    }

    /// Capture group by name
    pub fn name(&self, name: &str) -> Option<&'p str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Number of explicit capture groups in the pattern
    pub fn group_count(&self) -> usize {
        self.captures.len() - 1
    }

    /// Raw regex captures
    pub fn captures(&self) -> &Captures<'p> {
        &self.captures
    }
}

/// Route logic that wants to see the match
pub trait MatchHandler: Send + Sync {
    fn handle_route(&self, route: &RouteMatch<'_>, request: &Request) -> HandlerResult;
}

impl<F> MatchHandler for F
where
    F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync,
{
    fn handle_route(&self, route: &RouteMatch<'_>, request: &Request) -> HandlerResult {
        self(route, request)
    }
}

/// Adapts a plain [`Handler`], ignoring the match
struct IgnoreMatch<H>(H);

impl<H: Handler> MatchHandler for IgnoreMatch<H> {
    fn handle_route(&self, _route: &RouteMatch<'_>, request: &Request) -> HandlerResult {
        self.0.handle(request)
    }
}

/// Handler for a single method and path pattern
pub struct RouteHandler {
    method: String,
    pattern: RoutePattern,
    inner: Box<dyn MatchHandler>,
}

impl RouteHandler {
    /// Route to match-aware logic
    pub fn new(
        method: impl Into<String>,
        pattern: RoutePattern,
        handler: impl MatchHandler + 'static,
    ) -> Self {
        Self {
            method: method.into(),
            pattern,
            inner: Box::new(handler),
        }
    }

    /// Route to a closure receiving the match and the request
    pub fn with_match<F>(method: impl Into<String>, pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(method, pattern, f)
    }

    /// Route to an existing handler; the match is not passed on
    pub fn with_handler(
        method: impl Into<String>,
        pattern: RoutePattern,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(method, pattern, IgnoreMatch(handler))
    }

    /// Route to a producer that always answers
    pub fn with_producer<F, R>(method: impl Into<String>, pattern: RoutePattern, f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoResponse + Send + Sync + 'static,
    {
        Self::with_match(method, pattern, move |_: &RouteMatch<'_>, _: &Request| respond(f()))
    }

    /// GET route
    pub fn get<F>(pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_match(Method::Get, pattern, f)
    }

    /// POST route
    pub fn post<F>(pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_match(Method::Post, pattern, f)
    }

    /// PUT route
    pub fn put<F>(pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_match(Method::Put, pattern, f)
    }

    /// DELETE route
    pub fn delete<F>(pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_match(Method::Delete, pattern, f)
    }

    /// PATCH route
    pub fn patch<F>(pattern: RoutePattern, f: F) -> Self
    where
        F: Fn(&RouteMatch<'_>, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_match(Method::Patch, pattern, f)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

impl Handler for RouteHandler {
    fn handle(&self, request: &Request) -> HandlerResult {
        if !self.method.eq_ignore_ascii_case(&request.method) {
            return Ok(None);
        }

        let Some(path) = uri::decoded_path(&request.uri) else {
            tracing::debug!(uri = %request.uri, route = %self.pattern.as_str(), "declining unparsable request-target");
            return Ok(None);
        };

        match self.pattern.match_path(&path) {
            Some(route) => self.inner.handle_route(&route, request),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{decline, handler_fn};
    use crate::{Error, HttpError, Response, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pattern(expr: &str) -> RoutePattern {
        RoutePattern::new(expr).unwrap()
    }

    fn body(result: HandlerResult) -> Option<String> {
        result
            .unwrap()
            .map(|reply| reply.into_response().body_string().unwrap_or_default())
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let route = RouteHandler::with_producer("GET", pattern("/"), || "home");

        assert_eq!(body(route.handle(&Request::new("GET", "/"))).as_deref(), Some("home"));
        assert_eq!(body(route.handle(&Request::new("get", "/"))).as_deref(), Some("home"));
        assert_eq!(body(route.handle(&Request::new("gEt", "/"))).as_deref(), Some("home"));
    }

    #[test]
    fn test_method_mismatch_never_delegates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let route = RouteHandler::with_match("GET", pattern("/.*"), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            respond("hit")
        });

        for method in ["post", "PUT", "Get ", " GET", "", "GETS"] {
            assert!(route.handle(&Request::new(method, "/anything")).unwrap().is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_capture_groups() {
        let route = RouteHandler::get(pattern(r"^/users/(\d+)$"), |m, _| {
            assert_eq!(m.path(), "/users/42");
            assert_eq!(m.group_count(), 1);
            respond(m.get(1).unwrap_or("").to_string())
        });

        assert_eq!(body(route.handle(&Request::new("GET", "/users/42"))).as_deref(), Some("42"));
    }

    #[test]
    fn test_partial_match_declines() {
        let route = RouteHandler::get(pattern(r"^/users/(\d+)$"), |_, _| respond("user"));

        assert!(route.handle(&Request::new("GET", "/users/42/extra")).unwrap().is_none());
        assert!(route.handle(&Request::new("GET", "/api/users/42")).unwrap().is_none());
    }

    #[test]
    fn test_unanchored_pattern_is_full_match() {
        let route = RouteHandler::get(pattern(r"/users/\d+"), |_, _| respond("user"));

        assert!(route.handle(&Request::new("GET", "/users/42")).unwrap().is_some());
        assert!(route.handle(&Request::new("GET", "/users/42/extra")).unwrap().is_none());
    }

    #[test]
    fn test_alternation_prefers_full_match() {
        let route = RouteHandler::get(pattern("/a|/ab"), |m, _| respond(m.path().to_string()));

        assert_eq!(body(route.handle(&Request::new("GET", "/ab"))).as_deref(), Some("/ab"));
    }

    #[test]
    fn test_named_groups() {
        let route = RouteHandler::get(pattern(r"/posts/(?P<slug>[a-z-]+)"), |m, _| {
            respond(m.name("slug").unwrap_or("").to_string())
        });

        assert_eq!(
            body(route.handle(&Request::new("GET", "/posts/hello-world"))).as_deref(),
            Some("hello-world")
        );
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let route = RouteHandler::get(pattern("/search"), |_, _| respond("results"));

        assert!(route.handle(&Request::new("GET", "/search?q=rust#top")).unwrap().is_some());
    }

    #[test]
    fn test_matches_decoded_path() {
        let route = RouteHandler::get(pattern("/files/(.+)"), |m, _| respond(m.get(1).unwrap_or("").to_string()));

        assert_eq!(
            body(route.handle(&Request::new("GET", "/files/my%20notes.txt"))).as_deref(),
            Some("my notes.txt")
        );
    }

    #[test]
    fn test_malformed_uri_declines() {
        let route = RouteHandler::get(pattern(".*"), |_, _| respond("anything"));

        assert!(route.handle(&Request::new("GET", "http://[::1")).unwrap().is_none());
        assert!(route.handle(&Request::new("GET", "/bad%zz")).unwrap().is_none());
    }

    #[test]
    fn test_forbidden_uri_characters_decline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let route = RouteHandler::get(pattern(".*"), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            respond("anything")
        });

        for uri in ["/a|b", "/a{b}", "/a\"b", "/a^b", "/a\\b"] {
            assert!(route.handle(&Request::new("GET", uri)).unwrap().is_none(), "{uri}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_relative_reference_matches() {
        let route = RouteHandler::get(pattern(r"users/(\d+)"), |m, _| {
            respond(m.get(1).unwrap_or("").to_string())
        });

        assert_eq!(body(route.handle(&Request::new("GET", "users/42"))).as_deref(), Some("42"));
    }

    #[test]
    fn test_long_target_matches() {
        let route = RouteHandler::get(pattern("/blob/[a-z]+"), |_, _| respond("blob"));
        let uri = format!("/blob/{}", "x".repeat(70_000));

        assert!(route.handle(&Request::new("GET", uri)).unwrap().is_some());
    }

    #[test]
    fn test_with_handler_passes_result_through() {
        let inner = handler_fn(|req: &Request| {
            if req.header("x-skip").is_some() {
                decline()
            } else {
                Err(HttpError::forbidden("no").into())
            }
        });
        let route = RouteHandler::with_handler(Method::Delete, pattern("/items/.*"), inner);

        let skipped = Request {
            headers: smallvec::smallvec![("X-Skip".to_string(), "1".to_string())],
            ..Request::new("DELETE", "/items/1")
        };
        assert!(route.handle(&skipped).unwrap().is_none());

        let err = route.handle(&Request::new("delete", "/items/1")).unwrap_err();
        assert!(err.is_response());
    }

    #[test]
    fn test_inner_failure_passes_through() {
        let route = RouteHandler::post(pattern("/upload"), |_, _| Err(Error::handler("disk full")));

        let err = route.handle(&Request::new("POST", "/upload")).unwrap_err();
        assert!(!err.is_response());
    }

    #[test]
    fn test_match_handler_struct() {
        struct Echo;

        impl MatchHandler for Echo {
            fn handle_route(&self, route: &RouteMatch<'_>, request: &Request) -> HandlerResult {
                respond(Response::text(format!("{} {}", request.method, route.path())))
            }
        }

        let route = RouteHandler::new("PATCH", pattern("/echo"), Echo);
        assert_eq!(body(route.handle(&Request::new("patch", "/echo"))).as_deref(), Some("patch /echo"));
        assert_eq!(route.method(), "PATCH");
        assert_eq!(route.pattern().as_str(), "/echo");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(RoutePattern::new("(unclosed"), Err(Error::InvalidPattern(_))));
        assert!(RoutePattern::new("a)(b").is_err());
        assert!("/ok".parse::<RoutePattern>().is_ok());
    }

    #[test]
    fn test_verbose_pattern_with_trailing_comment() {
        let plain = pattern("(?x)/a # trailing comment");
        assert!(plain.match_path("/a").is_some());
        assert!(plain.match_path("/ab").is_none());

        let route = RouteHandler::get(pattern("(?x) /users/ (\\d+)  # numeric id"), |m, _| {
            respond(m.get(1).unwrap_or("").to_string())
        });
        assert_eq!(body(route.handle(&Request::new("GET", "/users/7"))).as_deref(), Some("7"));
        assert!(route.handle(&Request::new("GET", "/users/7x")).unwrap().is_none());
    }

    #[test]
    fn test_producer_status() {
        let route = RouteHandler::with_producer(Method::Put, pattern("/gone"), || StatusCode::NO_CONTENT);

        let reply = route.handle(&Request::new("PUT", "/gone")).unwrap().unwrap();
        assert_eq!(reply.into_response().status, StatusCode::NO_CONTENT);
    }
}
