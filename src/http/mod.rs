//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, tower layers)
//!     → middleware/ (access log)
//!     → pipeline.rs (ordered stages)
//!         → static_files.rs (service worker, static assets)
//!         → proxy.rs (upstream forwarding)
//!         → history.rs (SPA rewrite)
//!         → micro_cache.rs → response.rs (404)
//!     → Send to client
//! ```

pub mod history;
pub mod micro_cache;
pub mod middleware;
pub mod pipeline;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use pipeline::{Flow, Pipeline, Stage, Wrapper};
pub use server::build_router;
