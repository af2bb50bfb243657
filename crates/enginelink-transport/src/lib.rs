//! Transport abstraction layer for enginelink.
//!
//! Provides the [`Connection`] and [`Dialer`] traits that abstract over the
//! duplex channel used to talk to an engine instance. A connection carries
//! whole binary frames; it never splits or merges them.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//!
//! The in-memory transport ([`MemoryConnection`]) is always available.

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::MemoryConnection;
#[cfg(feature = "websocket")]
pub use websocket::{DEFAULT_API_PATH, WebSocketConnection, WebSocketDialer};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single duplex connection that sends and receives whole frames.
///
/// Implementations must serialize concurrent [`send`](Self::send) calls so
/// that frames never interleave on the wire. Reads are expected to have a
/// single owner (the RPC receive loop); concurrent `recv` calls are allowed
/// but receive frames in arbitrary order.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection. Closing twice is not an error.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Opens connections to an engine listening on `host:port`.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Opens a new connection.
    async fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<dyn Connection>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
