//! The per-tick decision hook and what it is handed each tick.
//!
//! The step loop owns one [`ChatInbox`] for the whole match and builds a
//! fresh [`StepTick`] (with a fresh [`AbortSink`]) every time the
//! simulation step advances. The handler communicates back only through
//! the abort sink and through the RPC client it is lent.

use std::sync::OnceLock;

use async_trait::async_trait;
use enginelink_protocol::{ChatReceived, PlayerResult, ResponseObservation};
use enginelink_rpc::RpcClient;
use tokio::sync::mpsc;

use crate::HandlerError;

// ---------------------------------------------------------------------------
// StepHandler
// ---------------------------------------------------------------------------

/// Caller-supplied decision logic for one participant.
///
/// `on_step` runs at most once per distinct increasing simulation step.
/// The loop awaits it before polling the next observation, so a slow
/// handler slows the loop rather than queueing ticks.
#[async_trait]
pub trait StepHandler: Send + 'static {
    async fn on_step(&mut self, tick: &mut StepTick<'_>);

    /// Called once after the session joined a match, before the first
    /// observation.
    async fn on_match_start(&mut self, _player_id: u32) {}

    /// Called when an observation reports the match results.
    async fn on_match_end(&mut self, _results: &[PlayerResult]) {}
}

// ---------------------------------------------------------------------------
// StepTick
// ---------------------------------------------------------------------------

/// Everything a handler sees for one tick.
pub struct StepTick<'a> {
    player_id: u32,
    step: u32,
    observation: &'a ResponseObservation,
    client: &'a RpcClient,
    chats: &'a mut ChatInbox,
    abort: &'a AbortSink,
}

impl<'a> StepTick<'a> {
    pub(crate) fn new(
        player_id: u32,
        observation: &'a ResponseObservation,
        client: &'a RpcClient,
        chats: &'a mut ChatInbox,
        abort: &'a AbortSink,
    ) -> Self {
        Self {
            player_id,
            step: observation.observation.game_loop,
            observation,
            client,
            chats,
            abort,
        }
    }

    /// The player id the engine assigned on join.
    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    /// The simulation step this tick was built for.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// The full observation that triggered this tick.
    pub fn observation(&self) -> &ResponseObservation {
        self.observation
    }

    /// Client for issuing actions and queries during the tick.
    pub fn client(&self) -> &RpcClient {
        self.client
    }

    /// Chats received so far and not yet consumed.
    pub fn chats(&mut self) -> &mut ChatInbox {
        self.chats
    }

    /// Ends the session with `error` once this tick returns.
    ///
    /// Only the first signal posted on a tick counts; returns `false` if
    /// one was already posted.
    pub fn abort(&self, error: impl Into<HandlerError>) -> bool {
        self.abort.post(Some(error.into()))
    }

    /// Ends the session cleanly once this tick returns.
    pub fn finish(&self) -> bool {
        self.abort.post(None)
    }
}

// ---------------------------------------------------------------------------
// AbortSink
// ---------------------------------------------------------------------------

/// Write-once stop signal for one tick.
///
/// `Some(err)` aborts the session with `err`; `None` stops it cleanly. A
/// sink nobody posted to lets the loop continue.
#[derive(Debug, Default)]
pub struct AbortSink {
    slot: OnceLock<Option<HandlerError>>,
}

impl AbortSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a signal. Returns `false` if one was already posted; the
    /// first value is kept.
    pub fn post(&self, signal: Option<HandlerError>) -> bool {
        self.slot.set(signal).is_ok()
    }

    /// Consumes the sink. Outer `None` means nothing was posted.
    pub fn into_signal(self) -> Option<Option<HandlerError>> {
        self.slot.into_inner()
    }
}

// ---------------------------------------------------------------------------
// ChatInbox
// ---------------------------------------------------------------------------

/// Bounded queue of inbound chat events.
///
/// Pushing never blocks: once the inbox holds `capacity` events, newer
/// ones are dropped with a warning and the queued ones stay available.
#[derive(Debug)]
pub struct ChatInbox {
    tx: mpsc::Sender<ChatReceived>,
    rx: mpsc::Receiver<ChatReceived>,
}

impl ChatInbox {
    /// Creates an inbox holding up to `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx }
    }

    /// Queues `chat`. Returns `false` if the inbox was full and the chat
    /// was dropped.
    pub fn push(&self, chat: ChatReceived) -> bool {
        match self.tx.try_send(chat) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(chat))
            | Err(mpsc::error::TrySendError::Closed(chat)) => {
                tracing::warn!(
                    player_id = chat.player_id,
                    message = %chat.message,
                    "chat inbox full, dropping chat"
                );
                false
            }
        }
    }

    /// Takes the oldest queued chat, if any.
    pub fn pop(&mut self) -> Option<ChatReceived> {
        self.rx.try_recv().ok()
    }

    /// Takes every queued chat, oldest first.
    pub fn drain(&mut self) -> Vec<ChatReceived> {
        std::iter::from_fn(|| self.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}
