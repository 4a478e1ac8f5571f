//! Response construction and cache headers.
//!
//! # Responsibilities
//! - Terminal 404 page
//! - `Cache-Control: max-age` for static assets
//! - No-store header set for the entry document
//!
//! # Design Decisions
//! - Header values are fixed strings; clients and intermediaries see
//!   exactly the same bytes on every response

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body of the terminal 404 response.
pub const NOT_FOUND_BODY: &str = "404 | Page Not Found";

/// `Cache-Control` sent with the entry document.
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

const SURROGATE_CONTROL: &str = "surrogate-control";

/// Caching headers applied to a served file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHeaders {
    /// `Cache-Control: max-age=<secs>`.
    MaxAge(u64),
    /// The entry-document no-store set.
    NoStore,
    /// Leave caching headers alone.
    Untouched,
}

impl CacheHeaders {
    pub fn apply(self, headers: &mut HeaderMap) {
        match self {
            CacheHeaders::MaxAge(secs) => {
                if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", secs)) {
                    headers.insert(header::CACHE_CONTROL, value);
                }
            }
            CacheHeaders::NoStore => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
                headers.insert(
                    HeaderName::from_static(SURROGATE_CONTROL),
                    HeaderValue::from_static("no-store"),
                );
            }
            CacheHeaders::Untouched => {}
        }
    }
}

/// The terminal stage: always answers 404.
#[derive(Debug, Clone)]
pub struct NotFoundPage {
    silent: bool,
}

impl NotFoundPage {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn respond(&self, req: &Request<Body>) -> Response {
        if !self.silent {
            tracing::info!(method = %req.method(), path = %req.uri().path(), "404 | Page Not Found");
        }
        not_found()
    }
}

/// `404` with `Content-Type: text/html` and the fixed body.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_store_overrides_max_age() {
        let mut headers = HeaderMap::new();
        CacheHeaders::MaxAge(600).apply(&mut headers);
        CacheHeaders::NoStore.apply(&mut headers);

        assert_eq!(headers[header::CACHE_CONTROL], NO_STORE);
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(headers["surrogate-control"], "no-store");
        assert_eq!(headers.get_all(header::CACHE_CONTROL).iter().count(), 1);
    }

    #[test]
    fn test_max_age() {
        let mut headers = HeaderMap::new();
        CacheHeaders::MaxAge(86_400).apply(&mut headers);
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=86400");
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let req = Request::builder().uri("/missing").body(Body::empty()).unwrap();
        let res = NotFoundPage::new(true).respond(&req);

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], NOT_FOUND_BODY.as_bytes());
    }
}
