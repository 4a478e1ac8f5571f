//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI args + captured environment (PORT, HOST, executable dir)
//!     → loader.rs (precedence: flag > env > default)
//!     → validation.rs (semantic checks)
//!     → rules file loaded (routing::rules)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; there is no reload
//! - Every field has a default so `ServerConfig::default()` is usable in tests
//! - Validation separates syntactic (clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve, CliArgs, Environment};
pub use schema::ServerConfig;
pub use validation::ValidationError;
