//! Free local ports and the per-match port allocation.

use async_trait::async_trait;
use enginelink_protocol::PortSet;
use tokio::net::TcpListener;

use crate::LaunchError;

/// Source of free port numbers.
#[async_trait]
pub trait PortProvider: Send + Sync + 'static {
    async fn allocate(&self) -> Result<u16, LaunchError>;
}

/// Asks the OS for a free port by binding port 0 and releasing it.
///
/// The port is free when returned but not reserved; another process may
/// take it before the engine binds it.
#[derive(Debug, Clone)]
pub struct LocalPortProvider {
    host: String,
}

impl LocalPortProvider {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Default for LocalPortProvider {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

#[async_trait]
impl PortProvider for LocalPortProvider {
    async fn allocate(&self) -> Result<u16, LaunchError> {
        let listener = TcpListener::bind((self.host.as_str(), 0))
            .await
            .map_err(LaunchError::Port)?;
        let port = listener.local_addr().map_err(LaunchError::Port)?.port();
        Ok(port)
    }
}

/// The ports both sides of one match are wired up with.
///
/// Both join requests carry the same allocation: `server` names the
/// host's game/base ports and `client` the joining client's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocation {
    pub server: PortSet,
    pub client: PortSet,
}

impl PortAllocation {
    /// Draws four ports from `provider`.
    pub async fn allocate(provider: &dyn PortProvider) -> Result<Self, LaunchError> {
        let server = PortSet {
            game_port: provider.allocate().await?,
            base_port: provider.allocate().await?,
        };
        let client = PortSet {
            game_port: provider.allocate().await?,
            base_port: provider.allocate().await?,
        };
        tracing::debug!(?server, ?client, "ports allocated");
        Ok(Self { server, client })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU16, Ordering};

    use super::*;

    struct Sequential(AtomicU16);

    #[async_trait]
    impl PortProvider for Sequential {
        async fn allocate(&self) -> Result<u16, LaunchError> {
            Ok(self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    #[tokio::test]
    async fn test_allocation_draws_server_then_client() {
        let provider = Sequential(AtomicU16::new(6000));
        let ports = PortAllocation::allocate(&provider).await.unwrap();
        assert_eq!(ports.server, PortSet { game_port: 6000, base_port: 6001 });
        assert_eq!(ports.client, PortSet { game_port: 6002, base_port: 6003 });
    }

    #[tokio::test]
    async fn test_local_provider_returns_nonzero_port() {
        let port = LocalPortProvider::default().allocate().await.unwrap();
        assert_ne!(port, 0);
    }
}
