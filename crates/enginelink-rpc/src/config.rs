//! RPC configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for an [`RpcClient`](crate::RpcClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// How long each call waits for its response.
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}
