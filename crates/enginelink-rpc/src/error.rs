//! Error types for the RPC layer.

use std::fmt;
use std::time::Duration;

use enginelink_protocol::{ProtocolError, RequestKind};
use enginelink_transport::TransportError;

/// Why a correlator stopped accepting calls.
///
/// Once set, every outstanding and future call fails fast with
/// [`RpcError::TransportBroken`] instead of waiting for its timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokenCause {
    /// The engine closed the connection.
    PeerClosed,
    /// Reading a frame failed.
    ReadFailed(String),
    /// A frame could not be decoded; the connection was closed.
    Malformed(String),
    /// Writing a frame failed.
    WriteFailed(String),
}

impl fmt::Display for BrokenCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "connection closed by engine"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::Malformed(e) => write!(f, "malformed frame: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// Errors returned by [`Correlator`](crate::Correlator) and
/// [`RpcClient`](crate::RpcClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Writing the request failed. The transport is now marked broken.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[source] ProtocolError),

    /// The transport stopped working before a response arrived.
    #[error("transport broken: {0}")]
    TransportBroken(BrokenCause),

    /// The engine answered with a non-empty error list.
    #[error("{kind} failed: engine reported {errors:?}")]
    Application {
        kind: RequestKind,
        errors: Vec<String>,
    },

    /// No response arrived within the configured window.
    #[error("no response to request {id} within {after:?}")]
    Timeout { id: u32, after: Duration },

    /// Waited on an identifier that has no pending call (never sent, or
    /// already being waited on). Indicates a caller defect.
    #[error("invalid request id {0}")]
    InvalidIdentifier(u32),

    /// The response's result does not match the request's operation.
    #[error("expected {expected} result, got {got:?}")]
    UnexpectedResponse {
        expected: RequestKind,
        got: Option<RequestKind>,
    },
}

impl RpcError {
    /// Returns the engine's error list for [`RpcError::Application`].
    pub fn application_errors(&self) -> Option<&[String]> {
        match self {
            Self::Application { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
