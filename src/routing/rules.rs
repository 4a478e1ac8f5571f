//! Proxy rules file loading.
//!
//! The rules file is a list of `{ path, rule }` entries. JSON is the
//! default format; a `.toml` extension switches to `[[rule]]` tables.
//!
//! ```json
//! [
//!   { "path": "/api", "rule": "http://localhost:8080" },
//!   { "path": "/auth", "rule": { "target": "http://localhost:9000", "changeOrigin": true,
//!                               "pathRewrite": { "^/auth": "" } } }
//! ]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// A single path-prefix forwarding directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyRule {
    /// Path prefix the rule applies to.
    #[serde(rename = "path")]
    pub path_prefix: String,

    /// How matching requests are forwarded.
    #[serde(rename = "rule")]
    pub target: ForwardingSpec,
}

/// Where and how a matching request is forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawForwardingSpec")]
pub struct ForwardingSpec {
    /// Upstream base URL.
    pub target: String,

    /// Rewrite the `Host` header to the upstream authority.
    #[serde(rename = "changeOrigin")]
    pub change_origin: bool,

    /// Regex → replacement pairs applied to the forwarded path.
    #[serde(rename = "pathRewrite")]
    pub path_rewrite: BTreeMap<String, String>,

    /// Extra request headers sent upstream.
    pub headers: BTreeMap<String, String>,
}

impl ForwardingSpec {
    /// Plain forwarding to `target` with no rewriting.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            change_origin: false,
            path_rewrite: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }
}

/// Rules accept either a bare target string or the full object form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawForwardingSpec {
    Target(String),
    Full {
        target: String,
        #[serde(default, rename = "changeOrigin")]
        change_origin: bool,
        #[serde(default, rename = "pathRewrite")]
        path_rewrite: BTreeMap<String, String>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl From<RawForwardingSpec> for ForwardingSpec {
    fn from(raw: RawForwardingSpec) -> Self {
        match raw {
            RawForwardingSpec::Target(target) => ForwardingSpec::to(target),
            RawForwardingSpec::Full {
                target,
                change_origin,
                path_rewrite,
                headers,
            } => ForwardingSpec {
                target,
                change_origin,
                path_rewrite,
                headers,
            },
        }
    }
}

#[derive(Deserialize)]
struct TomlRules {
    #[serde(default)]
    rule: Vec<ProxyRule>,
}

/// Load proxy rules from disk, preserving file order.
///
/// A missing file is an error; there is no fallback to an empty rule set.
pub fn load_rules(path: &Path) -> Result<Vec<ProxyRule>, ServerError> {
    if !path.is_file() {
        return Err(ServerError::ProxyRulesNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let rules = parse_rules(path, &content)?;

    tracing::info!(path = %path.display(), rules = rules.len(), "Proxy rules loaded");
    Ok(rules)
}

fn parse_rules(path: &Path, content: &str) -> Result<Vec<ProxyRule>, ServerError> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        toml::from_str::<TomlRules>(content)
            .map(|file| file.rule)
            .map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Vec<ProxyRule>>(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ServerError::ProxyRulesParse {
        path: path.to_path_buf(),
        message,
    })
}
