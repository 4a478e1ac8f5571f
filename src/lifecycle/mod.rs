//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     ServerConfig + Pipeline → TLS material → Bind → Serve → Summary
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain connections → Task exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: certificate first, then the listener
//! - Bind failures surface immediately; no retry
//! - TLS drain has a deadline; plaintext drains until idle

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, ListeningServer};
