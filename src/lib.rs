//! devserve: a local development web server.
//!
//! Serves a static site or single-page app over HTTP or HTTPS through a
//! fixed request pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                       DEVSERVE                       │
//!                  │                                                      │
//!  Client Request  │  ┌──────────┐   ┌─────────────┐   ┌──────────────┐   │
//!  ────────────────┼─▶│   net    │──▶│    http     │──▶│   pipeline   │   │
//!                  │  │listener/ │   │ CORS/log/   │   │ sw → proxy → │   │
//!                  │  │  tls     │   │    gzip     │   │ history →    │   │
//!                  │  └──────────┘   └─────────────┘   │ static →     │   │
//!                  │                                   │ cache → 404  │   │
//!                  │                                   └──────┬───────┘   │
//!                  │                                          │           │
//!                  │                         ┌────────────────┴─────┐     │
//!                  │                         ▼                      ▼     │
//!                  │                  ┌────────────┐         ┌──────────┐ │
//!                  │                  │ served root│         │ upstream │ │
//!                  │                  │   (disk)   │         │ (proxy)  │ │
//!                  │                  └────────────┘         └──────────┘ │
//!                  │                                                      │
//!                  │  config · routing · lifecycle · observability        │
//!                  └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

use std::sync::Arc;

pub use config::{CliArgs, Environment, ServerConfig};
pub use error::ServerError;
pub use http::Pipeline;
pub use lifecycle::{ListeningServer, Shutdown};

/// Build the pipeline for `config` and start serving it.
pub async fn launch(config: ServerConfig) -> Result<ListeningServer, ServerError> {
    let pipeline = Pipeline::from_config(&config)?;
    lifecycle::start(Arc::new(config), pipeline, None).await
}
