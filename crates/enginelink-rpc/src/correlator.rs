//! Request/response correlation over one connection.
//!
//! Many tasks may have calls outstanding on the same connection at once.
//! Each call gets a fresh identifier and a one-shot receptacle registered
//! in the pending table; a single background receive loop reads every
//! frame, looks up the identifier it carries, and drops the response into
//! the matching receptacle.
//!
//! ```text
//!  caller A ──send_request──┐                    ┌──> receptacle #1 ──> caller A
//!  caller B ──send_request──┼──> connection ──>  │
//!                           │    (engine)        │    receive loop
//!                           └──< frames <────────┴──> receptacle #2 ──> caller B
//! ```
//!
//! # Concurrency
//!
//! The pending table and the broken latch live behind one lock, so a call
//! is either registered before the transport breaks (and its receptacle
//! is dropped by the latch, waking the waiter) or it observes the latch
//! and never registers. A waiter therefore never hangs on a dead
//! transport. Delivery goes through the table keyed by identifier, so a
//! response can only reach the receptacle registered for its own id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use enginelink_protocol::{Codec, Request, RequestPayload, Response};
use enginelink_transport::{Connection, ConnectionId};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{BrokenCause, RpcError};

/// A call that has been sent and not yet answered or abandoned.
struct PendingCall {
    /// Taken by the receive loop when the response arrives.
    reply: Option<oneshot::Sender<Response>>,
    /// Taken by the one caller that waits on this id.
    receptacle: Option<oneshot::Receiver<Response>>,
}

#[derive(Default)]
struct TableState {
    calls: HashMap<u32, PendingCall>,
    broken: Option<BrokenCause>,
}

/// The pending-call table shared by callers and the receive loop.
#[derive(Default)]
struct PendingTable {
    state: Mutex<TableState>,
}

impl PendingTable {
    fn register(
        &self,
        id: u32,
        reply: oneshot::Sender<Response>,
        receptacle: oneshot::Receiver<Response>,
    ) -> Result<(), RpcError> {
        let mut state = self.state.lock();
        if let Some(cause) = &state.broken {
            return Err(RpcError::TransportBroken(cause.clone()));
        }
        let previous = state.calls.insert(
            id,
            PendingCall {
                reply: Some(reply),
                receptacle: Some(receptacle),
            },
        );
        if previous.is_some() {
            // Only reachable after 2^32 calls with one still outstanding.
            tracing::warn!(id, "request id reused while still pending");
        }
        Ok(())
    }

    fn take_receptacle(
        &self,
        id: u32,
    ) -> Result<oneshot::Receiver<Response>, RpcError> {
        let mut state = self.state.lock();
        if let Some(rx) =
            state.calls.get_mut(&id).and_then(|call| call.receptacle.take())
        {
            return Ok(rx);
        }
        match &state.broken {
            Some(cause) => Err(RpcError::TransportBroken(cause.clone())),
            None => Err(RpcError::InvalidIdentifier(id)),
        }
    }

    fn remove(&self, id: u32) {
        self.state.lock().calls.remove(&id);
    }

    fn deliver(&self, response: Response) {
        let Some(id) = response.id else {
            tracing::warn!("response without id, dropping");
            return;
        };
        let mut state = self.state.lock();
        let Some(call) = state.calls.get_mut(&id) else {
            tracing::warn!(id, "no pending call for response, dropping");
            return;
        };
        match call.reply.take() {
            Some(reply) => {
                if reply.send(response).is_err() {
                    tracing::warn!(id, "caller gave up, dropping response");
                }
            }
            None => tracing::warn!(id, "duplicate response, dropping"),
        }
    }

    /// Latches the broken state and wakes every waiter. First cause wins.
    fn mark_broken(&self, cause: BrokenCause) {
        let mut state = self.state.lock();
        if state.broken.is_none() {
            tracing::warn!(%cause, pending = state.calls.len(), "transport broken");
            state.broken = Some(cause);
        }
        state.calls.clear();
    }

    fn broken(&self) -> Option<BrokenCause> {
        self.state.lock().broken.clone()
    }

    fn len(&self) -> usize {
        self.state.lock().calls.len()
    }
}

/// Removes a pending call when its waiter finishes, however it finishes
/// (response, timeout, transport failure, or the waiting future being
/// dropped).
struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

/// Multiplexes concurrent calls over a single connection.
///
/// Creating a correlator spawns its receive loop, so it must be created
/// inside a Tokio runtime. Dropping it stops the loop.
pub struct Correlator<C: Codec> {
    conn: Arc<dyn Connection>,
    codec: Arc<C>,
    next_id: AtomicU32,
    table: Arc<PendingTable>,
    receive_loop: JoinHandle<()>,
}

impl<C: Codec> Correlator<C> {
    /// Wraps `conn` and starts reading responses from it.
    pub fn new(conn: Arc<dyn Connection>, codec: C) -> Self {
        let codec = Arc::new(codec);
        let table = Arc::new(PendingTable::default());
        let receive_loop = tokio::spawn(receive_loop(
            Arc::clone(&conn),
            Arc::clone(&codec),
            Arc::clone(&table),
        ));
        Self {
            conn,
            codec,
            next_id: AtomicU32::new(0),
            table,
            receive_loop,
        }
    }

    /// The underlying connection's id (for logging).
    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Stamps a fresh identifier into `payload`, registers a pending call,
    /// and writes the request.
    ///
    /// On any failure the pending call is discarded, so no identifier is
    /// left behind. A write failure also marks the transport broken.
    pub async fn send_request(
        &self,
        payload: RequestPayload,
    ) -> Result<u32, RpcError> {
        if let Some(cause) = self.table.broken() {
            return Err(RpcError::TransportBroken(cause));
        }

        // `fetch_add` wraps, so ids cycle after 2^32 calls. Ids start at 1.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let kind = payload.kind();
        let (reply, receptacle) = oneshot::channel();
        self.table.register(id, reply, receptacle)?;

        let request = Request {
            id: Some(id),
            request: payload,
        };
        let frame = match self.codec.encode(&request) {
            Ok(frame) => frame,
            Err(e) => {
                self.table.remove(id);
                return Err(RpcError::Encode(e));
            }
        };

        if let Err(e) = self.conn.send(&frame).await {
            self.table.remove(id);
            self.table.mark_broken(BrokenCause::WriteFailed(e.to_string()));
            return Err(RpcError::Transport(e));
        }

        tracing::trace!(id, %kind, conn = %self.conn.id(), "request sent");
        Ok(id)
    }

    /// Waits up to `timeout` for the response to request `id`.
    ///
    /// Fails immediately with [`RpcError::InvalidIdentifier`] if `id` has no
    /// pending call, and with [`RpcError::TransportBroken`] as soon as the
    /// transport is known to be dead. The pending call is removed on every
    /// outcome.
    pub async fn wait_for_response(
        &self,
        id: u32,
        timeout: Duration,
    ) -> Result<Response, RpcError> {
        let receptacle = self.table.take_receptacle(id)?;
        let _guard = PendingGuard {
            table: &self.table,
            id,
        };

        match tokio::time::timeout(timeout, receptacle).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RpcError::TransportBroken(
                self.table.broken().unwrap_or(BrokenCause::PeerClosed),
            )),
            Err(_) => {
                tracing::debug!(id, ?timeout, "request timed out");
                Err(RpcError::Timeout { id, after: timeout })
            }
        }
    }

    /// Returns why the transport broke, if it has.
    pub fn broken(&self) -> Option<BrokenCause> {
        self.table.broken()
    }

    /// Number of calls currently registered.
    pub fn pending_len(&self) -> usize {
        self.table.len()
    }

    /// Closes the underlying connection. The receive loop ends once the
    /// connection reports end-of-stream.
    pub async fn close(&self) -> Result<(), RpcError> {
        self.conn.close().await.map_err(RpcError::Transport)
    }
}

impl<C: Codec> Drop for Correlator<C> {
    fn drop(&mut self) {
        self.receive_loop.abort();
    }
}

/// Reads frames until the first read or decode failure, delivering each
/// response to its pending call. Never restarts: the broken latch is set on
/// exit.
async fn receive_loop<C: Codec>(
    conn: Arc<dyn Connection>,
    codec: Arc<C>,
    table: Arc<PendingTable>,
) {
    let conn_id = conn.id();
    tracing::debug!(conn = %conn_id, "receive loop started");

    let cause = loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break BrokenCause::PeerClosed,
            Err(e) => break BrokenCause::ReadFailed(e.to_string()),
        };
        match codec.decode::<Response>(&frame) {
            Ok(response) => table.deliver(response),
            Err(e) => {
                let _ = conn.close().await;
                break BrokenCause::Malformed(e.to_string());
            }
        }
    };

    tracing::info!(conn = %conn_id, %cause, "receive loop stopped");
    table.mark_broken(cause);
}
