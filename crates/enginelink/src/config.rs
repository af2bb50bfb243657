//! Coordinator configuration.

use std::path::PathBuf;

use enginelink_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Settings shared by both sessions of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub session: SessionConfig,

    /// Reveal the whole map to both players.
    pub disable_fog: bool,

    /// Run matches in real time instead of stepping them.
    pub realtime: bool,

    /// Where maps with a source file are copied before the host creates
    /// the match. Defaults to the located engine install's `Maps`.
    pub maps_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            disable_fog: false,
            realtime: true,
            maps_dir: None,
        }
    }
}
