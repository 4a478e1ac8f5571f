//! Configuration resolution.
//!
//! CLI flags beat environment variables, which beat built-in defaults.
//! Environment state is captured once by the binary into [`Environment`];
//! nothing below this module reads the process environment.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::schema::{
    ServerConfig, DEFAULT_CACHE_MAX_AGE_SECS, DEFAULT_HOSTNAME, DEFAULT_INDEX_FILE,
    DEFAULT_MICRO_CACHE_SECS, DEFAULT_PORT,
};
use crate::config::validation::{validate_config, ValidationError};
use crate::error::ServerError;
use crate::routing::rules::load_rules;

/// File name of the generated self-signed bundle.
pub const CERT_STORE_FILE: &str = "devserve.pem";

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "devserve")]
#[command(about = "Local development server for static sites and single-page apps", long_about = None)]
pub struct CliArgs {
    /// Directory to serve.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Port to listen on [default: 4000, or $PORT]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind [default: 0.0.0.0, or $HOST]
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Disable gzip compression.
    #[arg(long)]
    pub no_gzip: bool,

    /// Suppress request logging.
    #[arg(short, long)]
    pub silent: bool,

    /// Disable colored log output.
    #[arg(long)]
    pub no_color: bool,

    /// Cache-Control max-age for static assets, in seconds.
    #[arg(short, long, default_value_t = DEFAULT_CACHE_MAX_AGE_SECS)]
    pub cache: u64,

    /// Do not send Cache-Control max-age for static assets.
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Micro-cache lifetime in seconds (0 disables).
    #[arg(short, long, default_value_t = DEFAULT_MICRO_CACHE_SECS)]
    pub micro_cache: u64,

    /// Rewrite unmatched navigation requests to the index file.
    #[arg(short = 'f', long)]
    pub history: bool,

    /// Entry document, relative to the served directory.
    #[arg(short, long, default_value = DEFAULT_INDEX_FILE)]
    pub index: PathBuf,

    /// Serve over HTTPS.
    #[arg(short = 'S', long)]
    pub https: bool,

    /// TLS certificate file (PEM).
    #[arg(long, requires = "https")]
    pub cert: Option<PathBuf>,

    /// TLS private key file (PEM).
    #[arg(long, requires = "https")]
    pub key: Option<PathBuf>,

    /// Proxy rules file (JSON, or TOML with a .toml extension).
    #[arg(short = 'P', long)]
    pub proxy: Option<PathBuf>,

    /// Add permissive CORS headers to every response.
    #[arg(long)]
    pub cors: bool,
}

/// Environment-derived overrides, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub port: Option<String>,
    pub host: Option<String>,
    /// Directory of the running executable.
    pub install_dir: Option<PathBuf>,
}

impl Environment {
    /// Capture `PORT`, `HOST` and the executable directory.
    pub fn capture() -> Self {
        Self {
            port: std::env::var("PORT").ok().filter(|v| !v.is_empty()),
            host: std::env::var("HOST").ok().filter(|v| !v.is_empty()),
            install_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }
}

/// Resolve CLI arguments and environment into a validated `ServerConfig`.
pub fn resolve(args: CliArgs, env: Environment) -> Result<ServerConfig, ServerError> {
    let port = match (args.port, env.port.as_deref()) {
        (Some(port), _) => port,
        (None, Some(raw)) => raw
            .parse::<u16>()
            .map_err(|_| ServerError::InvalidConfig(vec![ValidationError::InvalidPort(raw.to_string())]))?,
        (None, None) => DEFAULT_PORT,
    };

    let hostname = args
        .host
        .or(env.host)
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

    let cert_store_path = env
        .install_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ssl")
        .join(CERT_STORE_FILE);

    let mut config = ServerConfig {
        root: absolute_root(&args.root)?,
        port,
        hostname,
        gzip: !args.no_gzip,
        silent: args.silent,
        colors: !args.no_color,
        cache_max_age_secs: (!args.no_cache).then_some(args.cache),
        micro_cache_secs: args.micro_cache,
        history_fallback: args.history,
        index_file: args.index,
        https: args.https,
        cors: args.cors,
        user_key_path: args.key,
        user_cert_path: args.cert,
        cert_store_path,
        proxy_rules: Vec::new(),
    };

    validate_config(&config).map_err(ServerError::InvalidConfig)?;

    if let Some(path) = &args.proxy {
        config.proxy_rules = load_rules(path)?;
    }

    Ok(config)
}

fn absolute_root(root: &Path) -> Result<PathBuf, ServerError> {
    match root.canonicalize() {
        Ok(path) => Ok(path),
        // Left for validation to report as missing.
        Err(_) => Ok(std::path::absolute(root)?),
    }
}
