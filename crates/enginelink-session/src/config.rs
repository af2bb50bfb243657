//! Session and engine launch configuration.

use std::path::PathBuf;
use std::time::Duration;

use enginelink_rpc::RpcConfig;
use enginelink_transport::DEFAULT_API_PATH;
use serde::{Deserialize, Serialize};

/// How a session talks to its engine and runs its step loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub rpc: RpcConfig,

    /// Capacity of the chat inbox handed to the step handler. Chats that
    /// arrive while it is full are dropped.
    pub chat_capacity: usize,

    /// Pause after the best-effort quit during teardown, giving the engine
    /// time to exit before its process is killed.
    pub quit_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            chat_capacity: 100,
            quit_grace: Duration::from_secs(10),
        }
    }
}

/// How a local engine process is started and reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Engine executable. When `None` it is read from the install's
    /// `ExecuteInfo.txt`.
    pub executable: Option<PathBuf>,

    /// Address the engine listens on.
    pub host: String,

    /// WebSocket path of the engine API.
    pub api_path: String,

    pub display_mode: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub window_x: i32,
    pub window_y: i32,

    /// How long to wait after spawning before dialing the engine.
    pub startup_delay: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: None,
            host: "127.0.0.1".to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            display_mode: 0,
            window_width: 1024,
            window_height: 768,
            window_x: 100,
            window_y: 100,
            startup_delay: Duration::from_secs(10),
        }
    }
}
