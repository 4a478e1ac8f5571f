//! Tower middleware wrapping the pipeline stages.

pub mod access_log;

pub use access_log::{access_log_middleware, ACCESS_TARGET};
