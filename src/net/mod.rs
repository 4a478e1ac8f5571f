//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → certificate.rs (user key/cert, or persisted/generated self-signed bundle)
//!     → tls.rs (bundle → rustls acceptor config)
//!     → listener.rs (bind host:port)
//!     → Hand off to lifecycle::startup (plaintext or TLS server)
//! ```
//!
//! # Design Decisions
//! - Certificate material is obtained once at startup and never re-read
//! - TLS is optional and handled transparently; the pipeline is identical
//!   for both protocols

pub mod certificate;
pub mod listener;
pub mod tls;

pub use certificate::{obtain, CertificateBundle};
pub use listener::Listener;
