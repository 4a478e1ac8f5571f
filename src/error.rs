//! Startup-time error type.
//!
//! Per-request failures never reach this type: pipeline stages answer
//! with an HTTP response instead. Everything here is fatal to startup and
//! is reported by the binary before exiting with status 1.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::validation::ValidationError;

/// Fatal configuration or bootstrap error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("proxy rules file not found: {}", .0.display())]
    ProxyRulesNotFound(PathBuf),

    #[error("failed to parse proxy rules file {}: {message}", path.display())]
    ProxyRulesParse { path: PathBuf, message: String },

    #[error("invalid proxy rule for {path_prefix}: {message}")]
    InvalidProxyRule { path_prefix: String, message: String },

    #[error("TLS {kind} file not found: {}", path.display())]
    UserTlsFileMissing { kind: &'static str, path: PathBuf },

    #[error("failed to write generated certificate to {}: {source}", path.display())]
    CertificateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to generate self-signed certificate: {0}")]
    CertificateGenerate(#[from] rcgen::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("index file is not a valid URL path: {0}")]
    InvalidIndexUrl(String),

    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("failed to configure TLS: {0}")]
    Tls(std::io::Error),

    #[error("server on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
