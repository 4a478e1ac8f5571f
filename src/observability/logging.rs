//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honor `RUST_LOG`, falling back to a sensible default filter
//! - Toggle ANSI colors from the `--no-color` flag
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Pretty format on stderr; stdout stays free for piping

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "devserve=info,tower_http=warn";

/// Install the global subscriber. Later calls are ignored.
pub fn init(colors: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(colors)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
