//! Native HTTP transport adapter
//!
//! Serves any [`Handler`] over HTTP/1.1 using hyper with:
//! - Multi-threaded tokio runtime sized by [`ServerConfig::workers`]
//! - SO_REUSEPORT for load balancing
//! - TCP_NODELAY for low latency
//!
//! Dispatch itself is synchronous, so each request runs on the blocking pool.
//! Declines map to 404 and opaque failures to a logged 500.

use crate::{Error, Handler, IntoResponse, Request, Response, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".to_string(),
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Resolve the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no address for {}:{}", self.hostname, self.port),
                ))
            })
    }
}

/// Create a TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // SO_REUSEPORT - enable kernel load balancing across processes
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Convert a hyper request into our [`Request`], collecting the body
pub async fn from_hyper_request<B>(req: hyper::Request<B>) -> Result<Request>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| Error::InvalidRequest(format!("body read failed: {e}")))?
        .to_bytes();

    let mut request = Request::new(parts.method.as_str(), parts.uri.to_string());
    request.body = body;

    // Non-visible-ASCII header values are dropped
    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    Ok(request)
}

/// Convert our [`Response`] into a hyper response
pub fn to_hyper_response(res: Response) -> Result<hyper::Response<Full<Bytes>>> {
    let res = http::Response::<Bytes>::try_from(res)?;
    Ok(res.map(Full::new))
}

/// Run `handler` and settle every outcome into a response.
pub fn respond_to<H: Handler + ?Sized>(handler: &H, request: &Request) -> Response {
    match handler.handle(request) {
        Ok(Some(reply)) => reply.into_response(),
        Ok(None) => Response::not_found(),
        Err(Error::Respond(reply)) => reply.into_response(),
        Err(err) => {
            tracing::error!(error = %err, method = %request.method, uri = %request.uri, "handler failed");
            Response::internal_error()
        }
    }
}

fn plain_hyper_response(status: http::StatusCode) -> hyper::Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut res = hyper::Response::new(Full::new(Bytes::from_static(reason.as_bytes())));
    *res.status_mut() = status;
    res
}

async fn handle_hyper(
    handler: Arc<dyn Handler>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let request = match from_hyper_request(req).await {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting request");
            return Ok(plain_hyper_response(http::StatusCode::BAD_REQUEST));
        }
    };

    let response = match tokio::task::spawn_blocking(move || respond_to(&*handler, &request)).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "dispatch task panicked");
            return Ok(plain_hyper_response(http::StatusCode::INTERNAL_SERVER_ERROR));
        }
    };

    Ok(to_hyper_response(response).unwrap_or_else(|err| {
        tracing::error!(error = %err, "unencodable response");
        plain_hyper_response(http::StatusCode::INTERNAL_SERVER_ERROR)
    }))
}

async fn run(addr: SocketAddr, handler: Arc<dyn Handler>) -> Result<()> {
    let socket = create_optimized_socket(&addr)?;
    let listener = TcpListener::from_std(socket.into())?;
    tracing::info!(%addr, "listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let service = service_fn(move |req: hyper::Request<Incoming>| handle_hyper(Arc::clone(&handler), req));
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, error = %err, "connection closed with error");
            }
        });
    }
}

/// Serve `handler` until the process exits. Blocks the calling thread.
pub fn serve(config: ServerConfig, handler: Arc<dyn Handler>) -> Result<()> {
    let addr = config.socket_addr()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(addr, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler_fn, respond, DelegatingHandler, HttpError, StatusCode};

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new().hostname("127.0.0.1").port(8080).workers(2);

        assert_eq!(config.workers, 2);
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(ServerConfig::default().workers >= 1);
    }

    #[test]
    fn test_respond_to_outcomes() {
        let req = Request::new("GET", "/");

        let ok = handler_fn(|_: &Request| respond("fine"));
        assert_eq!(respond_to(&ok, &req).body_string().as_deref(), Some("fine"));

        let declined = handler_fn(|_: &Request| Ok(None));
        assert_eq!(respond_to(&declined, &req).status, StatusCode::NOT_FOUND);

        let rejected = handler_fn(|_: &Request| Err(HttpError::forbidden("keep out").into()));
        assert_eq!(respond_to(&rejected, &req).status, StatusCode::FORBIDDEN);

        let broken = handler_fn(|_: &Request| Err(Error::handler("boom")));
        assert_eq!(respond_to(&broken, &req).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_respond_to_dispatcher() {
        let dispatcher = DelegatingHandler::builder().build(StatusCode(418));
        assert_eq!(respond_to(&dispatcher, &Request::new("GET", "/")).status, StatusCode(418));
    }

    #[tokio::test]
    async fn test_from_hyper_request() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/users?active=1")
            .header("content-type", "text/plain")
            .body(Full::new(Bytes::from_static(b"hello")))
            .unwrap();

        let request = from_hyper_request(req).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.uri, "/users?active=1");
        assert_eq!(request.content_type(), Some("text/plain"));
        assert_eq!(request.body.as_ref(), b"hello");
    }

    #[test]
    fn test_to_hyper_response() {
        let res = to_hyper_response(Response::text("hi")).unwrap();
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    }
}
