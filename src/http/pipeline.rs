//! Request pipeline assembly.
//!
//! # Data Flow
//! ```text
//! Request
//!     → [CORS] → [access log] → [gzip]          (tower layers, wrapping)
//!     → service worker → proxy → history fallback
//!     → static files → [micro-cache] → 404      (stages, in order)
//! ```
//!
//! # Design Decisions
//! - Order is fixed at startup from the resolved config and never changes
//! - Wrapping concerns are tower layers; terminating concerns are stages
//! - A stage either answers or hands the (possibly rewritten) request on

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Uri};
use axum::response::Response;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::history::HistoryFallback;
use crate::http::micro_cache::MicroCache;
use crate::http::proxy::ProxyDispatch;
use crate::http::response::{not_found, NotFoundPage};
use crate::http::static_files::{ServiceWorkerMount, StaticResolver};

/// Outcome of a single stage.
#[derive(Debug)]
pub enum Flow {
    /// Pass the request to the next stage.
    Continue(Request<Body>),
    /// Stop here with this response.
    Respond(Response),
}

/// Cross-cutting layer around the stages, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    Cors,
    AccessLog,
    Compression,
}

impl Wrapper {
    pub fn name(&self) -> &'static str {
        match self {
            Wrapper::Cors => "cors",
            Wrapper::AccessLog => "access-log",
            Wrapper::Compression => "gzip",
        }
    }
}

/// A terminating pipeline stage.
#[derive(Debug)]
pub enum Stage {
    ServiceWorker(ServiceWorkerMount),
    Proxy(ProxyDispatch),
    HistoryFallback(HistoryFallback),
    Static(Arc<StaticResolver>),
    MicroCache(MicroCache),
    NotFound(NotFoundPage),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ServiceWorker(_) => "service-worker",
            Stage::Proxy(_) => "proxy",
            Stage::HistoryFallback(_) => "history-fallback",
            Stage::Static(_) => "static",
            Stage::MicroCache(_) => "micro-cache",
            Stage::NotFound(_) => "not-found",
        }
    }

    async fn handle(&self, req: Request<Body>) -> Flow {
        match self {
            Stage::ServiceWorker(mount) => mount.handle(req).await,
            Stage::Proxy(proxy) => proxy.handle(req).await,
            Stage::HistoryFallback(history) => history.handle(req).await,
            Stage::Static(resolver) => resolver.handle(req).await,
            Stage::MicroCache(cache) => Flow::Respond(cache.handle(req).await),
            Stage::NotFound(page) => Flow::Respond(page.respond(&req)),
        }
    }
}

/// The ordered request pipeline.
#[derive(Debug)]
pub struct Pipeline {
    wrappers: Vec<Wrapper>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Assemble the pipeline for a resolved configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let mut wrappers = Vec::new();
        if config.cors {
            wrappers.push(Wrapper::Cors);
        }
        if !config.silent {
            wrappers.push(Wrapper::AccessLog);
        }
        if config.gzip {
            wrappers.push(Wrapper::Compression);
        }

        let resolver = Arc::new(StaticResolver::new(config));
        let mut stages = Vec::new();

        if let Some(mount) = ServiceWorkerMount::detect(config) {
            stages.push(Stage::ServiceWorker(mount));
        }
        if !config.proxy_rules.is_empty() {
            stages.push(Stage::Proxy(ProxyDispatch::new(&config.proxy_rules)?));
        }
        if config.history_fallback {
            let index_url = config.index_url();
            let index_uri: Uri = index_url
                .parse()
                .map_err(|_| ServerError::InvalidIndexUrl(index_url.clone()))?;
            stages.push(Stage::HistoryFallback(HistoryFallback::new(resolver.clone(), index_uri)));
        }
        stages.push(Stage::Static(resolver));

        let not_found = NotFoundPage::new(config.silent);
        match config.micro_cache_ttl() {
            Some(ttl) => stages.push(Stage::MicroCache(MicroCache::new(ttl, not_found))),
            None => stages.push(Stage::NotFound(not_found)),
        }

        Ok(Self { wrappers, stages })
    }

    pub fn wrappers(&self) -> &[Wrapper] {
        &self.wrappers
    }

    pub fn has(&self, wrapper: Wrapper) -> bool {
        self.wrappers.contains(&wrapper)
    }

    /// Layer and stage names in request order.
    pub fn describe(&self) -> Vec<&'static str> {
        self.wrappers
            .iter()
            .map(Wrapper::name)
            .chain(self.stages.iter().map(Stage::name))
            .collect()
    }

    /// Run the stages until one responds.
    pub async fn dispatch(&self, mut req: Request<Body>) -> Response {
        for stage in &self.stages {
            match stage.handle(req).await {
                Flow::Continue(next) => req = next,
                Flow::Respond(response) => return response,
            }
        }
        not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ForwardingSpec, ProxyRule};
    use std::fs;

    fn config(root: &std::path::Path) -> ServerConfig {
        ServerConfig {
            root: root.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_order() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_config(&config(dir.path())).unwrap();

        assert_eq!(
            pipeline.describe(),
            vec!["access-log", "gzip", "static", "micro-cache"]
        );
    }

    #[test]
    fn test_full_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("service-worker.js"), "").unwrap();
        let cfg = ServerConfig {
            cors: true,
            history_fallback: true,
            proxy_rules: vec![ProxyRule {
                path_prefix: "/api".to_string(),
                target: ForwardingSpec::to("http://127.0.0.1:9000"),
            }],
            ..config(dir.path())
        };
        let pipeline = Pipeline::from_config(&cfg).unwrap();

        assert_eq!(
            pipeline.describe(),
            vec![
                "cors",
                "access-log",
                "gzip",
                "service-worker",
                "proxy",
                "history-fallback",
                "static",
                "micro-cache",
            ]
        );
    }

    #[test]
    fn test_minimal_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerConfig {
            silent: true,
            gzip: false,
            micro_cache_secs: 0,
            ..config(dir.path())
        };
        let pipeline = Pipeline::from_config(&cfg).unwrap();

        assert!(pipeline.wrappers().is_empty());
        assert_eq!(pipeline.describe(), vec!["static", "not-found"]);
    }

    #[test]
    fn test_invalid_proxy_rule_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerConfig {
            proxy_rules: vec![ProxyRule {
                path_prefix: "/api".to_string(),
                target: ForwardingSpec::to("ftp://example.com"),
            }],
            ..config(dir.path())
        };
        assert!(matches!(
            Pipeline::from_config(&cfg),
            Err(ServerError::InvalidProxyRule { .. })
        ));
    }
}
