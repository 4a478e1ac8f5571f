//! Static asset resolution and serving.
//!
//! # Responsibilities
//! - Map a URL path onto a file under the served root
//! - Substitute the index file for directories (unless history fallback owns it)
//! - Apply `Cache-Control: max-age` to served assets
//! - Force no-store headers on the entry document
//! - Serve `service-worker.js` with max-age 0 regardless of cache policy
//!
//! # Design Decisions
//! - Paths are percent-decoded once; anything but normal segments is a miss
//! - File bodies go through tower-http's `ServeFile` (content type,
//!   conditional requests, ranges)
//! - Caching headers are set on successful and `304` GET responses

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::config::ServerConfig;
use crate::http::pipeline::Flow;
use crate::http::request::is_read;
use crate::http::response::CacheHeaders;

/// URL path of the service worker mount.
pub const SERVICE_WORKER_PATH: &str = "/service-worker.js";

/// Resolves URL paths to files under the served root.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    root: PathBuf,
    /// Directory-index file; `None` disables substitution.
    index_file: Option<PathBuf>,
    entry: PathBuf,
    max_age: Option<u64>,
}

impl StaticResolver {
    /// General mount for the served root.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            root: config.root.clone(),
            index_file: (!config.history_fallback).then(|| config.index_file.clone()),
            entry: config.entry_path(),
            max_age: config.cache_max_age_secs,
        }
    }

    /// Map a URL path to an existing file, if any.
    pub async fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = relative_path(request_path)?;
        let candidate = self.root.join(relative);
        let meta = tokio::fs::metadata(&candidate).await.ok()?;

        if meta.is_file() {
            return Some(candidate);
        }

        if meta.is_dir() {
            let index = candidate.join(self.index_file.as_ref()?);
            let index_meta = tokio::fs::metadata(&index).await.ok()?;
            if index_meta.is_file() {
                return Some(index);
            }
        }

        None
    }

    /// True when `path` is the configured entry document.
    pub fn is_entry(&self, path: &Path) -> bool {
        path == self.entry
    }

    /// Serve the request if it maps to a file; otherwise pass it on.
    pub async fn handle(&self, req: Request<Body>) -> Flow {
        if !is_read(&req) {
            return Flow::Continue(req);
        }

        let Some(file) = self.resolve(req.uri().path()).await else {
            return Flow::Continue(req);
        };

        let cache = if req.method() == Method::GET {
            if self.is_entry(&file) {
                CacheHeaders::NoStore
            } else {
                self.max_age.map_or(CacheHeaders::Untouched, CacheHeaders::MaxAge)
            }
        } else {
            CacheHeaders::Untouched
        };

        Flow::Respond(serve_file(req, &file, cache).await)
    }
}

/// Dedicated mount for `/service-worker.js` at the served root.
#[derive(Debug, Clone)]
pub struct ServiceWorkerMount {
    file: PathBuf,
}

impl ServiceWorkerMount {
    /// Mount only when the file is present at startup.
    pub fn detect(config: &ServerConfig) -> Option<Self> {
        let file = config.service_worker_path();
        file.is_file().then_some(Self { file })
    }

    pub async fn handle(&self, req: Request<Body>) -> Flow {
        if req.uri().path() != SERVICE_WORKER_PATH || !is_read(&req) {
            return Flow::Continue(req);
        }

        match tokio::fs::metadata(&self.file).await {
            Ok(meta) if meta.is_file() => {
                let cache = if req.method() == Method::GET {
                    CacheHeaders::MaxAge(0)
                } else {
                    CacheHeaders::Untouched
                };
                Flow::Respond(serve_file(req, &self.file, cache).await)
            }
            _ => Flow::Continue(req),
        }
    }
}

/// Stream a file with tower-http, then apply caching headers on success.
pub async fn serve_file(req: Request<Body>, path: &Path, cache: CacheHeaders) -> Response {
    let mut response = match ServeFile::new(path).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        cache.apply(response.headers_mut());
    }
    response
}

/// Percent-decode a URL path into a relative filesystem path.
///
/// Returns `None` for undecodable paths or any non-normal segment, so a
/// request can never escape the served root.
fn relative_path(request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;

    let mut relative = PathBuf::new();
    for segment in decoded.split('/').filter(|s| !s.is_empty()) {
        if segment.contains('\\') || segment.contains('\0') {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => relative.push(part),
            (Some(Component::CurDir), None) => {}
            _ => return None,
        }
    }
    Some(relative)
}
