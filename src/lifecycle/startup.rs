//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a resolved config and pipeline into a bound, serving listener
//! - Choose the plaintext or TLS server; both run the same router
//! - Emit the startup summary once the socket is bound
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and returned to the caller
//! - Certificate material is ready before the socket is bound
//! - Listeners start last (traffic only when ready)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::{build_router, Pipeline};
use crate::lifecycle::shutdown::{wait_for, Shutdown};
use crate::net::{self, CertificateBundle, Listener};

/// Grace period for in-flight TLS connections after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server.
#[derive(Debug)]
pub struct ListeningServer {
    local_addr: SocketAddr,
    url: String,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), ServerError>>,
}

impl ListeningServer {
    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Browsable URL, e.g. `https://localhost:4000`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// A handle that can stop the server from elsewhere.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        self.wait().await
    }

    /// Wait until the server stops.
    pub async fn wait(self) -> Result<(), ServerError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ServerError::Io(std::io::Error::other(e))),
        }
    }
}

/// Bind and start serving `pipeline`.
///
/// With HTTPS enabled and no `bundle`, certificate material is obtained
/// from the user files or the certificate store first.
pub async fn start(
    config: Arc<ServerConfig>,
    pipeline: Pipeline,
    bundle: Option<CertificateBundle>,
) -> Result<ListeningServer, ServerError> {
    // 1. TLS material
    let tls = if config.https {
        let bundle = match bundle {
            Some(bundle) => bundle,
            None => net::obtain(&config)?,
        };
        tracing::debug!(source = ?bundle.source, "Certificate ready");
        Some(net::tls::rustls_config(&bundle).await?)
    } else {
        None
    };

    // 2. Bind
    let listener = Listener::bind(&config.bind_address())?;
    let local_addr = listener.local_addr();
    let url = display_url(config.https, &config.hostname, local_addr);

    let pipeline = Arc::new(pipeline);
    let stages = pipeline.describe();
    let app = build_router(pipeline).into_make_service_with_connect_info::<SocketAddr>();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    // 3. Serve
    let task = match tls {
        None => {
            let listener = listener.into_tokio()?;
            tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(wait_for(rx))
                    .await
                    .map_err(|source| ServerError::Serve { addr: local_addr, source })?;
                tracing::info!(address = %local_addr, "HTTP server stopped");
                Ok::<(), ServerError>(())
            })
        }
        Some(rustls) => {
            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    wait_for(rx).await;
                    handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                }
            });

            let server = axum_server::from_tcp_rustls(listener.into_std(), rustls).handle(handle);
            tokio::spawn(async move {
                server
                    .serve(app)
                    .await
                    .map_err(|source| ServerError::Serve { addr: local_addr, source })?;
                tracing::info!(address = %local_addr, "HTTPS server stopped");
                Ok::<(), ServerError>(())
            })
        }
    };

    tracing::info!(
        url = %url,
        address = %local_addr,
        root = %config.root.display(),
        https = config.https,
        gzip = config.gzip,
        cors = config.cors,
        history_fallback = config.history_fallback,
        cache_max_age = ?config.cache_max_age_secs,
        micro_cache_secs = config.micro_cache_secs,
        proxy_rules = config.proxy_rules.len(),
        pipeline = ?stages,
        "Serving {}",
        url
    );

    Ok(ListeningServer {
        local_addr,
        url,
        shutdown,
        task,
    })
}

/// Build the operator-facing URL; wildcard hosts display as `localhost`.
fn display_url(https: bool, hostname: &str, local_addr: SocketAddr) -> String {
    let scheme = if https { "https" } else { "http" };
    let host = match hostname.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => "localhost".to_string(),
        Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
        _ => hostname.trim_start_matches('[').trim_end_matches(']').to_string(),
    };
    format!("{}://{}:{}", scheme, host, local_addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_display_url() {
        assert_eq!(display_url(false, "0.0.0.0", addr(4000)), "http://localhost:4000");
        assert_eq!(display_url(true, "::", addr(4000)), "https://localhost:4000");
        assert_eq!(display_url(false, "127.0.0.1", addr(8080)), "http://127.0.0.1:8080");
        assert_eq!(display_url(false, "::1", addr(8080)), "http://[::1]:8080");
        assert_eq!(display_url(false, "dev.local", addr(80)), "http://dev.local:80");
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ServerConfig {
            root: dir.path().to_path_buf(),
            hostname: "127.0.0.1".to_string(),
            port: 0,
            silent: true,
            ..ServerConfig::default()
        });
        let pipeline = Pipeline::from_config(&config).unwrap();

        let server = start(config, pipeline, None).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.url().starts_with("http://127.0.0.1:"));

        tokio::time::timeout(Duration::from_secs(5), server.shutdown())
            .await
            .expect("shutdown should complete")
            .unwrap();
    }
}
