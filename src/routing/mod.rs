//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy rules file (JSON/TOML)
//!     → rules.rs (load, preserve order)
//!     → router.rs (compile targets, rewrites, headers)
//!     → Freeze as immutable ProxyRouter
//!
//! Incoming Request (path, method, Accept)
//!     → router.rs (first matching prefix → ProxyRoute)
//!     → matcher.rs (navigation detection for history fallback)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered as supplied)

pub mod matcher;
pub mod router;
pub mod rules;

pub use router::{ProxyRoute, ProxyRouter};
pub use rules::{load_rules, ForwardingSpec, ProxyRule};
