//! Maps in the rotation and installing them where the engine finds them.

use std::path::{Path, PathBuf};

use enginelink_protocol::MapRef;
use enginelink_session::SessionError;
use serde::{Deserialize, Serialize};

/// A map to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    /// File name under the engine's maps directory, e.g. `Arena.SC2Map`.
    pub name: String,

    /// A map file to copy into the maps directory first. `None` if the
    /// map is already installed.
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

impl GameMap {
    /// A map that is already installed.
    pub fn installed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_path: None,
        }
    }

    /// A map copied from `source` before each match on it.
    pub fn from_file(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: Some(source.into()),
        }
    }

    pub fn needs_install(&self) -> bool {
        self.source_path.is_some()
    }

    /// What the create request names.
    pub fn map_ref(&self) -> MapRef {
        MapRef::LocalMap {
            map_path: self.name.clone(),
        }
    }

    /// Copies the source file to `<maps_dir>/<name>`, creating `maps_dir`
    /// if needed. Does nothing for maps without a source file.
    pub async fn install(&self, maps_dir: &Path) -> Result<(), SessionError> {
        let Some(source) = &self.source_path else {
            return Ok(());
        };
        let map_install_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SessionError::MapInstall { path, source }
        };

        tokio::fs::create_dir_all(maps_dir)
            .await
            .map_err(map_install_err(maps_dir))?;
        let target = maps_dir.join(&self.name);
        tokio::fs::copy(source, &target)
            .await
            .map_err(map_install_err(source))?;

        tracing::info!(map = %self.name, target = %target.display(), "map installed");
        Ok(())
    }
}
