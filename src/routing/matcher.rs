//! Request matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive) for proxy rules
//! - Recognise browser navigation requests for the history fallback
//!
//! # Design Decisions
//! - Path matching is plain `starts_with`, no segment awareness
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{header, Method, Request};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.uri().path().starts_with(&self.prefix)
    }
}

/// Matches requests a browser makes when navigating to a page.
///
/// A navigation request is a `GET`/`HEAD` that accepts HTML and whose last
/// path segment carries no file extension.
#[derive(Debug, Clone, Default)]
pub struct NavigationMatcher;

impl NavigationMatcher {
    fn accepts_html(req: &Request<Body>) -> bool {
        req.headers()
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html") || v.contains("*/*"))
    }

    fn looks_like_file(path: &str) -> bool {
        path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
    }
}

impl Matcher for NavigationMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        (req.method() == Method::GET || req.method() == Method::HEAD)
            && Self::accepts_html(req)
            && !Self::looks_like_file(req.uri().path())
    }
}
