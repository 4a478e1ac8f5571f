//! Compiled proxy rule table.

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use regex::Regex;
use url::Url;

use crate::error::ServerError;
use crate::routing::matcher::{Matcher, PathPrefixMatcher};
use crate::routing::rules::ProxyRule;

/// A proxy rule ready to dispatch.
#[derive(Debug)]
pub struct ProxyRoute {
    pub matcher: PathPrefixMatcher,
    pub scheme: Scheme,
    pub authority: Authority,
    /// Path of the target URL, without trailing slash.
    pub base_path: String,
    pub rewrites: Vec<(Regex, String)>,
    pub headers: HeaderMap,
    pub change_origin: bool,
}

impl ProxyRoute {
    /// Compile a rule, rejecting targets the forwarder cannot reach.
    pub fn compile(rule: &ProxyRule) -> Result<Self, ServerError> {
        let invalid = |message: String| ServerError::InvalidProxyRule {
            path_prefix: rule.path_prefix.clone(),
            message,
        };

        if !rule.path_prefix.starts_with('/') {
            return Err(invalid("path must start with '/'".to_string()));
        }

        let spec = &rule.target;
        let url = Url::parse(&spec.target).map_err(|e| invalid(format!("target {}: {}", spec.target, e)))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported target scheme {:?}", url.scheme())));
        }

        let host = url
            .host_str()
            .ok_or_else(|| invalid(format!("target {} has no host", spec.target)))?;
        let authority_str = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority: Authority = authority_str
            .parse()
            .map_err(|e| invalid(format!("target authority {}: {}", authority_str, e)))?;

        let mut rewrites = Vec::with_capacity(spec.path_rewrite.len());
        for (pattern, replacement) in &spec.path_rewrite {
            let regex = Regex::new(pattern).map_err(|e| invalid(format!("pathRewrite {}: {}", pattern, e)))?;
            rewrites.push((regex, replacement.clone()));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(format!("header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(Self {
            matcher: PathPrefixMatcher::new(rule.path_prefix.clone()),
            scheme: Scheme::HTTP,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
            rewrites,
            headers,
            change_origin: spec.change_origin,
        })
    }

    /// Upstream path-and-query for an incoming request.
    pub fn upstream_path(&self, path: &str, query: Option<&str>) -> String {
        let mut rewritten = path.to_string();
        for (regex, replacement) in &self.rewrites {
            rewritten = regex.replace_all(&rewritten, replacement.as_str()).into_owned();
        }
        if !rewritten.starts_with('/') {
            rewritten.insert(0, '/');
        }

        let mut out = format!("{}{}", self.base_path, rewritten);
        if let Some(query) = query {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}

/// Ordered proxy routes; first match wins.
#[derive(Debug, Default)]
pub struct ProxyRouter {
    routes: Vec<ProxyRoute>,
}

impl ProxyRouter {
    /// Compile rules in registration order.
    pub fn from_rules(rules: &[ProxyRule]) -> Result<Self, ServerError> {
        let routes = rules
            .iter()
            .map(ProxyRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// Find the first route whose prefix matches the request path.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&ProxyRoute> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }
}
