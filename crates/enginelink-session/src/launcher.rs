//! Bringing up an engine and connecting to it.

use std::sync::Arc;

use async_trait::async_trait;
use enginelink_transport::{Connection, Dialer, WebSocketDialer};

use crate::{
    EngineInstall, EngineProcess, LaunchConfig, LaunchError, LocalEngineProcess,
    LocalPortProvider, PortProvider,
};

/// A reachable engine: an open connection and, if this side started it,
/// the process to stop at teardown.
pub struct LaunchedEngine {
    pub connection: Arc<dyn Connection>,
    pub process: Option<Box<dyn EngineProcess>>,
}

/// Produces a connected engine for a session.
#[async_trait]
pub trait EngineLauncher: Send + Sync + 'static {
    async fn launch(&self) -> Result<LaunchedEngine, LaunchError>;
}

/// Starts an engine on this machine and dials its API over WebSocket.
///
/// Each launch picks a fresh listen port, spawns the engine on it, waits
/// `startup_delay` for it to come up, then dials. If the dial fails the
/// process is stopped before the error is returned.
pub struct LocalLauncher {
    config: LaunchConfig,
    ports: Arc<dyn PortProvider>,
    dialer: Arc<dyn Dialer>,
}

impl LocalLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        let ports = Arc::new(LocalPortProvider::new(config.host.clone()));
        let dialer = Arc::new(WebSocketDialer::new(config.api_path.clone()));
        Self {
            config,
            ports,
            dialer,
        }
    }

    /// Replaces the dialer (for a different transport or path).
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }
}

#[async_trait]
impl EngineLauncher for LocalLauncher {
    async fn launch(&self) -> Result<LaunchedEngine, LaunchError> {
        let install = EngineInstall::locate(&self.config).await?;
        let port = self.ports.allocate().await?;
        let mut process = LocalEngineProcess::new(install, &self.config, port)?;
        let pid = process.start().await?;
        tracing::info!(pid, host = %self.config.host, port, "engine listening");

        tokio::time::sleep(self.config.startup_delay).await;

        let connection = match self.dialer.dial(&self.config.host, port).await {
            Ok(connection) => connection,
            Err(e) => {
                if let Err(stop_err) = process.stop().await {
                    tracing::warn!(error = %stop_err, "failed to stop engine after dial failure");
                }
                return Err(e.into());
            }
        };

        Ok(LaunchedEngine {
            connection,
            process: Some(Box::new(process)),
        })
    }
}
