//! History API fallback for single-page apps.
//!
//! Navigation requests that do not name an existing file are rewritten to
//! the entry document, then continue to static resolution. Proxy rules run
//! before this stage, so proxied paths are never rewritten.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Uri};

use crate::http::pipeline::Flow;
use crate::http::static_files::StaticResolver;
use crate::routing::matcher::{Matcher, NavigationMatcher};

/// Rewrites unmatched navigation requests to the entry document.
#[derive(Debug, Clone)]
pub struct HistoryFallback {
    matcher: NavigationMatcher,
    resolver: Arc<StaticResolver>,
    index_uri: Uri,
}

impl HistoryFallback {
    pub fn new(resolver: Arc<StaticResolver>, index_uri: Uri) -> Self {
        Self {
            matcher: NavigationMatcher,
            resolver,
            index_uri,
        }
    }

    pub async fn handle(&self, mut req: Request<Body>) -> Flow {
        if !self.matcher.matches(&req) || req.uri().path() == self.index_uri.path() {
            return Flow::Continue(req);
        }

        if self.resolver.resolve(req.uri().path()).await.is_some() {
            return Flow::Continue(req);
        }

        tracing::debug!(from = %req.uri(), to = %self.index_uri, "History fallback rewrite");
        *req.uri_mut() = self.index_uri.clone();
        Flow::Continue(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::fs;

    fn fallback(root: &std::path::Path) -> HistoryFallback {
        let config = ServerConfig {
            root: root.to_path_buf(),
            history_fallback: true,
            ..ServerConfig::default()
        };
        let resolver = Arc::new(StaticResolver::new(&config));
        HistoryFallback::new(resolver, config.index_url().parse().unwrap())
    }

    fn nav(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Accept", "text/html")
            .body(Body::empty())
            .unwrap()
    }

    async fn rewritten_path(stage: &HistoryFallback, req: Request<Body>) -> String {
        match stage.handle(req).await {
            Flow::Continue(req) => req.uri().to_string(),
            Flow::Respond(_) => panic!("history fallback never responds"),
        }
    }

    #[tokio::test]
    async fn test_rewrites_unknown_navigation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "shell").unwrap();
        let stage = fallback(dir.path());

        assert_eq!(rewritten_path(&stage, nav("/dashboard/settings")).await, "/index.html");
        assert_eq!(rewritten_path(&stage, nav("/")).await, "/index.html");
        assert_eq!(rewritten_path(&stage, nav("/search?q=1")).await, "/index.html");
    }

    #[tokio::test]
    async fn test_idempotent_on_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "shell").unwrap();
        let stage = fallback(dir.path());

        assert_eq!(rewritten_path(&stage, nav("/index.html")).await, "/index.html");
    }

    #[tokio::test]
    async fn test_leaves_existing_files_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "shell").unwrap();
        fs::write(dir.path().join("about"), "plain file").unwrap();
        let stage = fallback(dir.path());

        assert_eq!(rewritten_path(&stage, nav("/about")).await, "/about");
        assert_eq!(rewritten_path(&stage, nav("/missing.js")).await, "/missing.js");

        let api = Request::builder()
            .uri("/data")
            .header("Accept", "application/json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(rewritten_path(&stage, api).await, "/data");
    }
}
