//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured `host:port`
//! - Surface the OS error on failure (port in use, permission denied)
//! - Hand the socket to either the plaintext or the TLS server
//!
//! # Design Decisions
//! - Binding is synchronous and happens before any server task is spawned,
//!   so bind errors are returned to the caller instead of logged by a task
//! - No retry on bind failure

use std::net::SocketAddr;

use crate::error::ServerError;

/// A bound, non-blocking TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: std::net::TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address` (`host:port`, host may be a name).
    pub fn bind(address: &str) -> Result<Self, ServerError> {
        let bind_err = |source: std::io::Error| ServerError::Bind {
            addr: address.to_string(),
            source,
        };

        let inner = std::net::TcpListener::bind(address).map_err(bind_err)?;
        inner.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::debug!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// For the TLS server, which takes a std listener.
    pub fn into_std(self) -> std::net::TcpListener {
        self.inner
    }

    /// For the plaintext server.
    pub fn into_tokio(self) -> Result<tokio::net::TcpListener, ServerError> {
        tokio::net::TcpListener::from_std(self.inner).map_err(ServerError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let listener = Listener::bind("127.0.0.1:0").unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert!(listener.into_tokio().is_ok());
    }

    #[test]
    fn test_port_in_use() {
        let first = Listener::bind("127.0.0.1:0").unwrap();
        let taken = first.local_addr().to_string();

        match Listener::bind(&taken) {
            Err(ServerError::Bind { addr, source }) => {
                assert_eq!(addr, taken);
                assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
            }
            other => panic!("expected bind error, got {:?}", other),
        }
    }
}
