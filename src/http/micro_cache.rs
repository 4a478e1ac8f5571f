//! Short-lived response cache in front of the terminal stage.
//!
//! # Responsibilities
//! - Answer repeated GETs for the same path+query from memory within the TTL
//! - Re-run the terminal stage once an entry has expired
//!
//! # Design Decisions
//! - Expiry is time-based; expired entries are swept on every miss
//! - Concurrent misses for one key are not collapsed; last write wins
//! - Bodies are buffered so a hit is byte-identical to the original

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::http::request::path_and_query;
use crate::http::response::NotFoundPage;

/// Largest body the cache will buffer.
const MAX_CACHED_BODY: usize = 8 * 1024 * 1024;

/// A captured response.
#[derive(Debug, Clone)]
pub struct MicroCacheEntry {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: Instant,
}

impl MicroCacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.stored_at) < ttl
    }

    fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// TTL cache wrapping the terminal 404 stage.
#[derive(Debug)]
pub struct MicroCache {
    ttl: Duration,
    entries: DashMap<String, MicroCacheEntry>,
    inner: NotFoundPage,
    executions: AtomicU64,
}

impl MicroCache {
    pub fn new(ttl: Duration, inner: NotFoundPage) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            inner,
            executions: AtomicU64::new(0),
        }
    }

    /// Number of times the wrapped stage has run.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry older than the TTL.
    fn evict_expired(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
    }

    pub async fn handle(&self, req: Request<Body>) -> Response {
        if req.method() != Method::GET {
            self.executions.fetch_add(1, Ordering::Relaxed);
            return self.inner.respond(&req);
        }

        let key = path_and_query(req.uri());
        let hit = self
            .entries
            .get(&key)
            .filter(|entry| entry.is_fresh(self.ttl, Instant::now()))
            .map(|entry| entry.to_response());
        if let Some(response) = hit {
            tracing::debug!(key = %key, "Micro-cache hit");
            return response;
        }

        self.evict_expired(Instant::now());

        self.executions.fetch_add(1, Ordering::Relaxed);
        let (parts, body) = self.inner.respond(&req).into_parts();
        let body = match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to buffer response for micro-cache");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        self.entries.insert(
            key,
            MicroCacheEntry {
                status: parts.status,
                headers: parts.headers.clone(),
                body: body.clone(),
                stored_at: Instant::now(),
            },
        );

        Response::from_parts(parts, Body::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_of(res: Response) -> Bytes {
        axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_hit_within_ttl_is_identical() {
        let cache = MicroCache::new(Duration::from_secs(60), NotFoundPage::new(true));

        let first = cache.handle(get("/missing?x=1")).await;
        let first_status = first.status();
        let first_headers = first.headers().clone();
        let first_body = body_of(first).await;

        let second = cache.handle(get("/missing?x=1")).await;
        assert_eq!(second.status(), first_status);
        assert_eq!(second.headers(), &first_headers);
        assert_eq!(body_of(second).await, first_body);

        assert_eq!(cache.executions(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_key_includes_query() {
        let cache = MicroCache::new(Duration::from_secs(60), NotFoundPage::new(true));

        cache.handle(get("/missing?x=1")).await;
        cache.handle(get("/missing?x=2")).await;

        assert_eq!(cache.executions(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_reexecutes() {
        let cache = MicroCache::new(Duration::from_millis(50), NotFoundPage::new(true));

        cache.handle(get("/missing")).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let res = cache.handle(get("/missing")).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(cache.executions(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted() {
        let cache = MicroCache::new(Duration::from_millis(250), NotFoundPage::new(true));

        for n in 0..100 {
            cache.handle(get(&format!("/missing?n={}", n))).await;
        }
        assert_eq!(cache.len(), 100);

        tokio::time::sleep(Duration::from_millis(300)).await;
        cache.handle(get("/missing?n=fresh")).await;

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_non_get_not_cached() {
        let cache = MicroCache::new(Duration::from_secs(60), NotFoundPage::new(true));
        let post = Request::builder()
            .method("POST")
            .uri("/missing")
            .body(Body::empty())
            .unwrap();

        let res = cache.handle(post).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(cache.is_empty());
    }
}
