//! In-memory duplex transport.
//!
//! Two [`MemoryConnection`]s created by [`MemoryConnection::pair`] are wired
//! back to back: a frame sent on one end is received on the other. Used to
//! run a fake engine inside the same process (tests, embedders).

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, TransportError};

/// One end of an in-memory duplex channel.
pub struct MemoryConnection {
    id: ConnectionId,
    /// `None` once this end has been closed.
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    /// Flipped by `close` so a pending `recv` on this end returns too.
    closed: watch::Sender<bool>,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a = Self {
            id: ConnectionId::next(),
            outbound: Mutex::new(Some(b_tx)),
            inbound: Mutex::new(a_rx),
            closed: watch::Sender::new(false),
        };
        let b = Self {
            id: ConnectionId::next(),
            outbound: Mutex::new(Some(a_tx)),
            inbound: Mutex::new(b_rx),
            closed: watch::Sender::new(false),
        };
        (a, b)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let delivered = match outbound.as_ref() {
            Some(tx) => tx.send(frame.to_vec()).is_ok(),
            None => false,
        };
        if delivered {
            Ok(())
        } else {
            Err(TransportError::ConnectionClosed(format!(
                "{} is closed",
                self.id
            )))
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut closed = self.closed.subscribe();
        let already_closed = *closed.borrow();
        if already_closed {
            return Ok(None);
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            frame = inbound.recv() => Ok(frame),
            _ = closed.wait_for(|closed| *closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outbound.lock().await.take();
        self.closed.send_replace(true);
        tracing::debug!(id = %self.id, "memory connection closed");
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
