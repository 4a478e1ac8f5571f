//! Configuration schema definitions.
//!
//! `ServerConfig` is the immutable snapshot every subsystem reads. It is
//! built once by [`crate::config::loader::resolve`] and shared via `Arc`.

use std::path::{Component, PathBuf};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use crate::routing::rules::ProxyRule;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default bind host (all interfaces).
pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";

/// Default `Cache-Control: max-age` for static assets, in seconds.
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 86_400;

/// Default micro-cache lifetime, in seconds.
pub const DEFAULT_MICRO_CACHE_SECS: u64 = 1;

/// Default entry document.
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Characters escaped in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Root configuration for the dev server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Absolute path of the served directory.
    pub root: PathBuf,

    /// Listening port (0 = ephemeral).
    pub port: u16,

    /// Bind host.
    pub hostname: String,

    /// Compress response bodies.
    pub gzip: bool,

    /// Suppress access and 404 logging.
    pub silent: bool,

    /// ANSI colors in log output.
    pub colors: bool,

    /// `Cache-Control: max-age` for static assets; `None` disables the header.
    pub cache_max_age_secs: Option<u64>,

    /// Micro-cache lifetime in seconds (0 = disabled).
    pub micro_cache_secs: u64,

    /// Rewrite unmatched navigation requests to the entry document.
    pub history_fallback: bool,

    /// Entry document, relative to `root`.
    pub index_file: PathBuf,

    /// Serve over TLS.
    pub https: bool,

    /// Add permissive CORS headers.
    pub cors: bool,

    /// User-supplied private key (PEM).
    pub user_key_path: Option<PathBuf>,

    /// User-supplied certificate (PEM).
    pub user_cert_path: Option<PathBuf>,

    /// Where the generated self-signed bundle is persisted.
    pub cert_store_path: PathBuf,

    /// Proxy rules in registration order.
    pub proxy_rules: Vec<ProxyRule>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            port: DEFAULT_PORT,
            hostname: DEFAULT_HOSTNAME.to_string(),
            gzip: true,
            silent: false,
            colors: true,
            cache_max_age_secs: Some(DEFAULT_CACHE_MAX_AGE_SECS),
            micro_cache_secs: DEFAULT_MICRO_CACHE_SECS,
            history_fallback: false,
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
            https: false,
            cors: false,
            user_key_path: None,
            user_cert_path: None,
            cert_store_path: PathBuf::from("ssl").join("devserve.pem"),
            proxy_rules: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Physical path of the entry document.
    pub fn entry_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }

    /// URL path the history fallback rewrites to, e.g. `/index.html`.
    pub fn index_url(&self) -> String {
        let segments: Vec<String> = self
            .index_file
            .components()
            .filter_map(|c| match c {
                Component::Normal(segment) => {
                    Some(utf8_percent_encode(&segment.to_string_lossy(), PATH_SEGMENT).to_string())
                }
                _ => None,
            })
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// Micro-cache lifetime, `None` when disabled.
    pub fn micro_cache_ttl(&self) -> Option<Duration> {
        (self.micro_cache_secs > 0).then(|| Duration::from_secs(self.micro_cache_secs))
    }

    /// `host:port` suitable for binding; IPv6 literals are bracketed.
    pub fn bind_address(&self) -> String {
        if self.hostname.contains(':') && !self.hostname.starts_with('[') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    /// `service-worker.js` at the served root.
    pub fn service_worker_path(&self) -> PathBuf {
        self.root.join("service-worker.js")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.hostname, "0.0.0.0");
        assert!(config.gzip);
        assert_eq!(config.cache_max_age_secs, Some(86_400));
        assert_eq!(config.micro_cache_secs, 1);
        assert_eq!(config.index_file, PathBuf::from("index.html"));
    }

    #[test]
    fn test_index_url() {
        let mut config = ServerConfig::default();
        assert_eq!(config.index_url(), "/index.html");

        config.index_file = PathBuf::from("app").join("shell.html");
        assert_eq!(config.index_url(), "/app/shell.html");

        config.index_file = PathBuf::from("my shell.html");
        assert_eq!(config.index_url(), "/my%20shell.html");
    }

    #[test]
    fn test_bind_address_brackets_ipv6() {
        let mut config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:4000");

        config.hostname = "::1".to_string();
        assert_eq!(config.bind_address(), "[::1]:4000");
    }

    #[test]
    fn test_micro_cache_ttl() {
        let mut config = ServerConfig::default();
        assert_eq!(config.micro_cache_ttl(), Some(Duration::from_secs(1)));

        config.micro_cache_secs = 0;
        assert_eq!(config.micro_cache_ttl(), None);
    }
}
