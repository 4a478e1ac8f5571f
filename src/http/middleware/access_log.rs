//! Access logging middleware.
//!
//! Emits one structured event per request on the `devserve::access`
//! target. The middleware never answers a request itself.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};

/// Tracing target for access log events.
pub const ACCESS_TARGET: &str = "devserve::access";

pub async fn access_log_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(req).await;

    tracing::info!(
        target: ACCESS_TARGET,
        method = %method,
        path = %path,
        client = %client,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "{} {}",
        method,
        path
    );

    response
}
