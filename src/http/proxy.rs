//! Proxy dispatch to upstream HTTP servers.
//!
//! # Responsibilities
//! - Match the request path against the proxy rule table
//! - Rewrite path and headers per the matched rule
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - One shared pooled client for all routes
//! - Hop-by-hop headers are dropped in both directions
//! - Connection failures become `502`; no retries

use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::ServerError;
use crate::http::pipeline::Flow;
use crate::routing::{ProxyRoute, ProxyRouter, ProxyRule};

/// Headers scoped to a single connection.
const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Proxy stage: forwards matching requests upstream.
#[derive(Debug)]
pub struct ProxyDispatch {
    router: ProxyRouter,
    client: Client<HttpConnector, Body>,
}

impl ProxyDispatch {
    pub fn new(rules: &[ProxyRule]) -> Result<Self, ServerError> {
        let router = ProxyRouter::from_rules(rules)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { router, client })
    }

    pub async fn handle(&self, req: Request<Body>) -> Flow {
        match self.router.match_request(&req) {
            Some(route) => Flow::Respond(self.forward(route, req).await),
            None => Flow::Continue(req),
        }
    }

    async fn forward(&self, route: &ProxyRoute, req: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = req.into_parts();

        // 1. Target URI
        let path = route.upstream_path(parts.uri.path(), parts.uri.query());
        let uri = match Uri::builder()
            .scheme(route.scheme.clone())
            .authority(route.authority.clone())
            .path_and_query(path.as_str())
            .build()
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(prefix = %route.matcher.prefix(), path = %path, error = %e, "Invalid upstream URI");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream URI").into_response();
            }
        };

        // 2. Headers
        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if route.change_origin {
            headers.remove(header::HOST);
        }
        for (name, value) in &route.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut upstream = Request::new(body);
        *upstream.method_mut() = parts.method.clone();
        *upstream.uri_mut() = uri.clone();
        *upstream.headers_mut() = headers;

        tracing::debug!(method = %parts.method, upstream = %uri, "Proxying request");

        // 3. Forward
        match self.client.request(upstream).await {
            Ok(response) => {
                tracing::debug!(
                    upstream = %uri,
                    status = response.status().as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                relay(response)
            }
            Err(e) => {
                tracing::warn!(upstream = %uri, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Hand an upstream response back to the client, minus hop-by-hop headers.
fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ForwardingSpec;

    fn dispatch(path: &str, target: &str) -> ProxyDispatch {
        ProxyDispatch::new(&[ProxyRule {
            path_prefix: path.to_string(),
            target: ForwardingSpec::to(target),
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_continues() {
        let stage = dispatch("/api", "http://127.0.0.1:1");
        let req = Request::builder().uri("/assets/app.js").body(Body::empty()).unwrap();
        assert!(matches!(stage.handle(req).await, Flow::Continue(_)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Port 1 is reserved and closed on test hosts.
        let stage = dispatch("/api", "http://127.0.0.1:1");
        let req = Request::builder().uri("/api/users").body(Body::empty()).unwrap();

        let Flow::Respond(res) = stage.handle(req).await else {
            panic!("matched request must be answered");
        };
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(header::ACCEPT, "*/*".parse().unwrap());

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }
}
