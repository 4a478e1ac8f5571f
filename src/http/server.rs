//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router around the request pipeline
//! - Wire up tower layers (CORS, access log, gzip) in pipeline order
//! - Dispatch every request to the pipeline stages
//!
//! # Design Decisions
//! - One fallback handler; there are no per-route handlers
//! - `TraceLayer` sits innermost and only emits debug spans
//! - Layers are added innermost first, so the last `.layer` call is the
//!   first to see a request

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Router,
};
use tower_http::{
    compression::{predicate::SizeAbove, CompressionLayer},
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::http::middleware::access_log_middleware;
use crate::http::pipeline::{Pipeline, Wrapper};

/// Application state injected into the handler.
pub type AppState = Arc<Pipeline>;

/// Build the Axum router for a pipeline.
pub fn build_router(pipeline: AppState) -> Router {
    let compression = pipeline.has(Wrapper::Compression);
    let access_log = pipeline.has(Wrapper::AccessLog);
    let cors = pipeline.has(Wrapper::Cors);

    let mut router = Router::new()
        .fallback(pipeline_handler)
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http());

    if compression {
        router = router.layer(CompressionLayer::new().compress_when(SizeAbove::new(0)));
    }
    if access_log {
        router = router.layer(middleware::from_fn(access_log_middleware));
    }
    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Run the request through the pipeline stages.
async fn pipeline_handler(State(pipeline): State<AppState>, request: Request<Body>) -> Response {
    pipeline.dispatch(request).await
}
