//! Unified error type for enginelink.

use enginelink_protocol::ProtocolError;
use enginelink_rpc::RpcError;
use enginelink_session::{LaunchError, PhaseError, SessionError};
use enginelink_transport::TransportError;

/// Errors from [`Coordinator::run`](crate::Coordinator::run).
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The map rotation is empty.
    #[error("no maps to play")]
    NoMaps,

    /// A map has a source file to install, no maps directory is set, and
    /// the engine install could not be located to provide one.
    #[error("map {map} needs installing and no maps directory was found: {source}")]
    NoMapsDir {
        map: String,
        #[source]
        source: LaunchError,
    },

    /// At least one session failed. Each side's outcome is reported,
    /// `None` meaning that side ended cleanly.
    #[error("sessions failed (host: {}, joiner: {})", describe(.host), describe(.joiner))]
    Sessions {
        host: Option<PhaseError>,
        joiner: Option<PhaseError>,
    },
}

fn describe(outcome: &Option<PhaseError>) -> String {
    match outcome {
        Some(e) => e.to_string(),
        None => "ok".to_string(),
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EngineLinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
