//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (startup summary, certificate actions, upstream errors)
//!     → http::middleware::access_log (one event per request)
//!
//! Consumers:
//!     → logging.rs (fmt subscriber on stderr, filtered by RUST_LOG)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event, human-readable formatting
//! - `--silent` removes the access log layer instead of filtering it

pub mod logging;

pub use logging::init;
