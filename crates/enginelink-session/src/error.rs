//! Error types for the session layer.

use std::fmt;
use std::path::PathBuf;

use enginelink_protocol::{CreateGameError, JoinGameError};
use enginelink_rpc::RpcError;
use enginelink_transport::TransportError;

use crate::SessionState;

/// Error a step handler posts to abort its session.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from bringing up an engine instance.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No engine executable could be located.
    #[error("engine executable not found: {0}")]
    ExecutableNotFound(String),

    /// The `ExecuteInfo.txt` record was not `executable = <path>`.
    #[error("unrecognized execute info in {path}: {content:?}")]
    BadExecuteInfo { path: PathBuf, content: String },

    /// Spawning, killing, or preparing directories for the process failed.
    #[error("engine process error: {0}")]
    Process(#[source] std::io::Error),

    /// `stop` was called on a process that was never started.
    #[error("engine process is not running")]
    NotRunning,

    /// Binding a local socket to find a free port failed.
    #[error("port allocation failed: {0}")]
    Port(#[source] std::io::Error),

    /// The engine was started but its API endpoint could not be reached.
    #[error("dial failed: {0}")]
    Dial(#[from] TransportError),
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),

    #[error("rpc failed: {0}")]
    Rpc(#[from] RpcError),

    /// CreateMatch returned a code other than the tolerated ones.
    #[error("create rejected: {code:?} ({details})")]
    CreateRejected {
        code: CreateGameError,
        details: String,
    },

    /// JoinMatch returned a code other than the tolerated ones.
    #[error("join rejected: {code:?} ({details})")]
    JoinRejected { code: JoinGameError, details: String },

    /// The step handler posted an error to its abort sink.
    #[error("step handler aborted: {0}")]
    Aborted(#[source] HandlerError),

    /// An operation was called in a state that does not allow it.
    #[error("{operation} not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The roster has no entry for this session's slot.
    #[error("roster has no player at index {0}")]
    MissingPlayer(usize),

    /// The step loop task panicked or was cancelled by the runtime.
    #[error("step loop task failed: {0}")]
    LoopPanicked(String),

    /// Copying a map into the engine's map directory failed.
    #[error("map install failed for {path}: {source}")]
    MapInstall {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where in the session lifecycle an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Launch, connect and handshake.
    Init,
    /// Create and join.
    Setup,
    /// The observation/step loop.
    Loop,
    /// Waiting for the loop to finish.
    Wait,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Setup => write!(f, "setup"),
            Self::Loop => write!(f, "loop"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

/// A [`SessionError`] tagged with the phase it occurred in.
///
/// This is the failure half of a session outcome; `Ok(())` is a clean end.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct PhaseError {
    pub phase: SessionPhase,
    #[source]
    pub source: SessionError,
}

impl PhaseError {
    pub fn new(phase: SessionPhase, source: impl Into<SessionError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}

/// Attaches a phase to a session result.
pub(crate) trait InPhase<T> {
    fn in_phase(self, phase: SessionPhase) -> Result<T, PhaseError>;
}

impl<T, E: Into<SessionError>> InPhase<T> for Result<T, E> {
    fn in_phase(self, phase: SessionPhase) -> Result<T, PhaseError> {
        self.map_err(|e| PhaseError::new(phase, e))
    }
}
