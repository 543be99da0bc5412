//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Report the actual bound address (port 0 resolves here)
//! - Map bind failures to a fatal startup error

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address (in use, permission denied, ...).
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bound TCP listener, ready to be handed to the HTTP server.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address: SocketAddr =
            config
                .bind_address
                .parse()
                .map_err(|source| ListenerError::Address {
                    address: config.bind_address.clone(),
                    source,
                })?;

        let inner = TcpListener::bind(address)
            .await
            .map_err(|source| ListenerError::Bind { address, source })?;

        let local_addr = inner
            .local_addr()
            .map_err(|source| ListenerError::Bind { address, source })?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bind_address: &str) -> ListenerConfig {
        ListenerConfig {
            bind_address: bind_address.to_string(),
        }
    }

    #[tokio::test]
    async fn port_zero_resolves_to_real_port() {
        let listener = Listener::bind(&config("127.0.0.1:0")).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn port_in_use_is_bind_error() {
        let first = Listener::bind(&config("127.0.0.1:0")).await.unwrap();
        let taken = first.local_addr().to_string();
        let err = Listener::bind(&config(&taken)).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn garbage_address_is_rejected() {
        let err = Listener::bind(&config("localhost")).await.unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }
}
