//! Locating and running a local engine process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::{LaunchConfig, LaunchError};

/// Start/stop control over one engine process.
#[async_trait]
pub trait EngineProcess: Send + 'static {
    /// Starts the process and returns its pid.
    async fn start(&mut self) -> Result<u32, LaunchError>;

    /// Stops the process.
    async fn stop(&mut self) -> Result<(), LaunchError>;
}

// ---------------------------------------------------------------------------
// EngineInstall
// ---------------------------------------------------------------------------

/// Where the engine lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInstall {
    /// The engine binary, `<install>/Versions/<build>/<binary>`.
    pub executable: PathBuf,
    /// Three levels above the binary.
    pub install_dir: PathBuf,
    /// `Support64` for 64-bit binaries, `Support` otherwise.
    pub work_dir: PathBuf,
}

impl EngineInstall {
    /// Derives the install layout from the binary's path.
    pub fn from_executable(executable: impl Into<PathBuf>) -> Result<Self, LaunchError> {
        let executable = executable.into();
        let install_dir = executable
            .ancestors()
            .nth(3)
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                LaunchError::ExecutableNotFound(executable.display().to_string())
            })?
            .to_path_buf();

        let is_x64 = executable
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("x64"));
        let work_dir = install_dir.join(if is_x64 { "Support64" } else { "Support" });

        Ok(Self {
            executable,
            install_dir,
            work_dir,
        })
    }

    /// Resolves the install from `config.executable`, or from the
    /// `ExecuteInfo.txt` record the engine writes under the user's
    /// documents directory.
    pub async fn locate(config: &LaunchConfig) -> Result<Self, LaunchError> {
        if let Some(executable) = &config.executable {
            return Self::from_executable(executable.clone());
        }
        let path = execute_info_path().ok_or_else(|| {
            LaunchError::ExecutableNotFound("no home directory".into())
        })?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| LaunchError::ExecutableNotFound(path.display().to_string()))?;
        let executable = parse_execute_info(&content)
            .ok_or_else(|| LaunchError::BadExecuteInfo { path, content })?;
        Self::from_executable(executable)
    }

    /// Directory the engine loads local maps from.
    pub fn maps_dir(&self) -> PathBuf {
        self.install_dir.join("Maps")
    }
}

fn execute_info_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    Some(
        Path::new(&home)
            .join("Documents")
            .join("StarCraft II")
            .join("ExecuteInfo.txt"),
    )
}

/// Parses `executable = <path>`, ignoring surrounding whitespace and NULs.
pub fn parse_execute_info(content: &str) -> Option<PathBuf> {
    let (key, value) = content.split_once('=')?;
    if key.trim() != "executable" {
        return None;
    }
    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!value.is_empty()).then(|| PathBuf::from(value))
}

// ---------------------------------------------------------------------------
// LocalEngineProcess
// ---------------------------------------------------------------------------

/// An engine process spawned on this machine, listening on `host:port`.
pub struct LocalEngineProcess {
    install: EngineInstall,
    args: Vec<String>,
    temp_dir: tempfile::TempDir,
    child: Option<Child>,
}

impl LocalEngineProcess {
    /// Prepares (but does not start) an engine listening on `port`.
    pub fn new(
        install: EngineInstall,
        config: &LaunchConfig,
        port: u16,
    ) -> Result<Self, LaunchError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("SC2_")
            .tempdir()
            .map_err(LaunchError::Process)?;
        let args = vec![
            "-listen".into(),
            config.host.clone(),
            "-port".into(),
            port.to_string(),
            "-displayMode".into(),
            config.display_mode.to_string(),
            "-windowwidth".into(),
            config.window_width.to_string(),
            "-windowheight".into(),
            config.window_height.to_string(),
            "-windowx".into(),
            config.window_x.to_string(),
            "-windowy".into(),
            config.window_y.to_string(),
            "-dataDir".into(),
            install.install_dir.display().to_string(),
            "-tempDir".into(),
            temp_dir.path().display().to_string(),
            "-verbose".into(),
        ];
        Ok(Self {
            install,
            args,
            temp_dir,
            child: None,
        })
    }

    /// Command-line arguments the engine is started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Pid of the running process.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

#[async_trait]
impl EngineProcess for LocalEngineProcess {
    async fn start(&mut self) -> Result<u32, LaunchError> {
        let child = Command::new(&self.install.executable)
            .args(&self.args)
            .current_dir(&self.install.work_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(LaunchError::Process)?;
        let pid = child.id().ok_or(LaunchError::NotRunning)?;
        self.child = Some(child);
        tracing::info!(pid, executable = %self.install.executable.display(), "engine process started");
        Ok(pid)
    }

    async fn stop(&mut self) -> Result<(), LaunchError> {
        let mut child = self.child.take().ok_or(LaunchError::NotRunning)?;
        child.kill().await.map_err(LaunchError::Process)?;
        tracing::info!("engine process stopped");
        Ok(())
    }
}
