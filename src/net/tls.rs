//! TLS configuration from certificate material.

use std::sync::Once;

use axum_server::tls_rustls::RustlsConfig;

use crate::error::ServerError;
use crate::net::certificate::CertificateBundle;

static INSTALL_PROVIDER: Once = Once::new();

/// Build the rustls acceptor configuration for a bundle.
pub async fn rustls_config(bundle: &CertificateBundle) -> Result<RustlsConfig, ServerError> {
    // Several rustls backends may be linked in; pin the process default.
    INSTALL_PROVIDER.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });

    RustlsConfig::from_pem(bundle.certificate.clone(), bundle.private_key.clone())
        .await
        .map_err(ServerError::Tls)
}
