// Minimal relay server: a few regex routes in front of a 404 default.
//
// cargo run -p relay-core --example hello --features native
// RUST_LOG=relay_core=trace to watch dispatch decisions.

use relay_core::{
    respond, serve, DelegatingHandler, Error, HttpError, Response, RouteHandler, RoutePattern,
    ServerConfig, StatusCode,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = DelegatingHandler::builder()
        .handler(RouteHandler::with_producer("GET", RoutePattern::new("/")?, || {
            Response::json(r#"{"message":"Hello World"}"#)
        }))
        .handler(RouteHandler::get(RoutePattern::new(r"/users/(\d+)")?, |m, _req| {
            let id: u32 = m
                .get(1)
                .unwrap_or_default()
                .parse()
                .map_err(|_| HttpError::bad_request("user id out of range"))?;
            if id == 0 {
                return Err(HttpError::not_found().into());
            }
            respond(format!("user {id}"))
        }))
        .handler(RouteHandler::post(RoutePattern::new("/echo")?, |_, req| {
            respond((StatusCode::OK, req.body.clone()))
        }))
        .build(Response::not_found());

    serve(ServerConfig::new().port(3456), Arc::new(app))
}
