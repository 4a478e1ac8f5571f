//! Request inspection helpers shared by pipeline stages.

use axum::body::Body;
use axum::http::{Method, Request, Uri};

/// `GET` or `HEAD`, the only methods served from disk.
pub fn is_read(req: &Request<Body>) -> bool {
    req.method() == Method::GET || req.method() == Method::HEAD
}

/// Full path plus query, e.g. `/search?q=x`.
pub fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let uri: Uri = "http://localhost:4000/search?q=rust&page=2".parse().unwrap();
        assert_eq!(path_and_query(&uri), "/search?q=rust&page=2");

        let bare: Uri = "/about".parse().unwrap();
        assert_eq!(path_and_query(&bare), "/about");
    }

    #[test]
    fn test_is_read() {
        let get = Request::builder().uri("/").body(Body::empty()).unwrap();
        let post = Request::builder().method("POST").uri("/").body(Body::empty()).unwrap();
        assert!(is_read(&get));
        assert!(!is_read(&post));
    }
}
