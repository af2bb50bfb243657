//! One engine instance driven through connect, setup, the step loop, and
//! leaving the match.

use std::sync::Arc;

use enginelink_protocol::{
    InterfaceOptions, JsonCodec, MapRef, Participation, PlayerSetup,
    RequestCreateGame, RequestJoinGame, RequestObservation, ResponsePing,
};
use enginelink_rpc::RpcClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::InPhase;
use crate::teardown::Teardown;
use crate::{
    AbortSink, ChatInbox, EngineLauncher, PhaseError, PortAllocation,
    SessionConfig, SessionError, SessionPhase, SessionRole, SessionState,
    StepHandler, StepTick,
};

/// What both sides of one match agree on before setup.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub map: MapRef,
    /// Full roster; the host is entry 0, the joiner entry 1.
    pub roster: Vec<PlayerSetup>,
    pub ports: PortAllocation,
    pub disable_fog: bool,
    pub realtime: bool,
}

/// What the step loop hands back when it ends.
struct LoopExit {
    handler: Option<Box<dyn StepHandler>>,
    result: Result<(), SessionError>,
}

/// Drives one connected engine through its matches.
///
/// ```text
/// connect ─> host_setup | join_setup ─> start_loop ─> wait_end ─┐
///                 ↑                                             │
///                 └───────────────── next match ────────────────┘
/// shutdown (or drop) runs the registered cleanup once.
/// ```
pub struct GameSession {
    role: SessionRole,
    config: SessionConfig,
    state: SessionState,
    client: Option<Arc<RpcClient>>,
    player_id: Option<u32>,
    handler: Option<Box<dyn StepHandler>>,
    loop_task: Option<JoinHandle<LoopExit>>,
    cancel: Option<watch::Receiver<bool>>,
    teardown: Teardown,
}

impl GameSession {
    pub fn new(role: SessionRole, config: SessionConfig) -> Self {
        Self {
            role,
            config,
            state: SessionState::Idle,
            client: None,
            player_id: None,
            handler: None,
            loop_task: None,
            cancel: None,
            teardown: Teardown::new(),
        }
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The player id assigned by the last successful join.
    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    /// The RPC client, once connected.
    pub fn client(&self) -> Option<&Arc<RpcClient>> {
        self.client.as_ref()
    }

    /// Installs the per-tick handler. With no handler the loop still polls
    /// observations until the match ends.
    pub fn set_handler(&mut self, handler: Option<Box<dyn StepHandler>>) {
        self.handler = handler;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    // -----------------------------------------------------------------------
    // Connect
    // -----------------------------------------------------------------------

    /// Launches an engine through `launcher`, opens the RPC client, and
    /// pings it. Returns the engine's handshake values.
    ///
    /// Cleanup for every step that succeeded is registered before the next
    /// step runs, so [`shutdown`](Self::shutdown) undoes a partial connect.
    pub async fn connect(
        &mut self,
        launcher: &dyn EngineLauncher,
    ) -> Result<ResponsePing, PhaseError> {
        self.transition(SessionState::Connected, "connect")
            .in_phase(SessionPhase::Init)?;

        let launched = launcher.launch().await.in_phase(SessionPhase::Init)?;
        if let Some(mut process) = launched.process {
            self.teardown.push("stop engine process", move || async move {
                if let Err(e) = process.stop().await {
                    tracing::warn!(error = %e, "failed to stop engine process");
                }
            });
        }

        let client = Arc::new(RpcClient::new(
            launched.connection,
            JsonCodec,
            self.config.rpc.clone(),
        ));
        let conn = client.correlator().connection_id();
        self.client = Some(Arc::clone(&client));
        {
            let client = Arc::clone(&client);
            self.teardown.push("close transport", move || async move {
                if let Err(e) = client.close().await {
                    tracing::warn!(error = %e, "failed to close transport");
                }
            });
        }

        let ping = client.ping().await.in_phase(SessionPhase::Init)?;
        tracing::info!(
            role = %self.role,
            %conn,
            game_version = %ping.game_version,
            base_build = ping.base_build,
            data_version = %ping.data_version,
            data_build = ping.data_build,
            "engine connected"
        );

        let grace = self.config.quit_grace;
        self.teardown.push("quit engine", move || async move {
            if let Err(e) = client.quit().await {
                tracing::warn!(error = %e, "quit failed");
            }
            tokio::time::sleep(grace).await;
        });

        self.state = SessionState::Connected;
        Ok(ping)
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Creates the match and joins it as roster entry 0. Returns the
    /// assigned player id.
    pub async fn host_setup(
        &mut self,
        setup: &MatchSetup,
    ) -> Result<u32, PhaseError> {
        self.begin_setup(SessionState::HostSetup, "host_setup")?;
        let client = self.connected_client("host_setup", SessionPhase::Setup)?;

        let request = RequestCreateGame {
            map: setup.map.clone(),
            player_setup: setup.roster.clone(),
            disable_fog: setup.disable_fog,
            random_seed: Some(rand::random()),
            realtime: setup.realtime,
        };
        let rsp = client
            .create_game(request)
            .await
            .in_phase(SessionPhase::Setup)?;
        if let Some(code) = rsp.error.filter(|_| !rsp.is_tolerated()) {
            return Err(PhaseError::new(
                SessionPhase::Setup,
                SessionError::CreateRejected {
                    code,
                    details: rsp.error_details.unwrap_or_default(),
                },
            ));
        }
        tracing::info!(role = %self.role, map = ?setup.map, "match created");

        self.join(&client, setup).await
    }

    /// Joins the host's match as roster entry 1. Returns the assigned
    /// player id.
    ///
    /// The engine holds the join response until both participants have
    /// joined, so this may be called before the host's create completes.
    pub async fn join_setup(
        &mut self,
        setup: &MatchSetup,
    ) -> Result<u32, PhaseError> {
        self.begin_setup(SessionState::JoinSetup, "join_setup")?;
        let client = self.connected_client("join_setup", SessionPhase::Setup)?;
        self.join(&client, setup).await
    }

    async fn join(
        &mut self,
        client: &RpcClient,
        setup: &MatchSetup,
    ) -> Result<u32, PhaseError> {
        let index = self.role.roster_index();
        let player = setup
            .roster
            .get(index)
            .ok_or(SessionError::MissingPlayer(index))
            .in_phase(SessionPhase::Setup)?;

        let request = RequestJoinGame {
            participation: Participation::Race(player.race),
            options: InterfaceOptions::default(),
            server_ports: Some(setup.ports.server),
            client_ports: vec![setup.ports.client],
            player_name: player.player_name.clone(),
        };
        let rsp = client
            .join_game(request)
            .await
            .in_phase(SessionPhase::Setup)?;
        if let Some(code) = rsp.error.filter(|_| !rsp.is_tolerated()) {
            return Err(PhaseError::new(
                SessionPhase::Setup,
                SessionError::JoinRejected {
                    code,
                    details: rsp.error_details.unwrap_or_default(),
                },
            ));
        }

        tracing::info!(role = %self.role, player_id = rsp.player_id, "match joined");
        self.player_id = Some(rsp.player_id);
        Ok(rsp.player_id)
    }

    // -----------------------------------------------------------------------
    // Step loop
    // -----------------------------------------------------------------------

    /// Spawns the step loop. It stops at match end, when the handler posts
    /// to its abort sink, on an RPC failure, or at the first iteration
    /// after `cancel` turns `true`.
    pub fn start_loop(
        &mut self,
        cancel: watch::Receiver<bool>,
    ) -> Result<(), PhaseError> {
        self.transition(SessionState::Looping, "start_loop")
            .in_phase(SessionPhase::Loop)?;
        let client = self.connected_client("start_loop", SessionPhase::Loop)?;
        let player_id = self
            .player_id
            .ok_or(SessionError::InvalidState {
                operation: "start_loop",
                state: self.state,
            })
            .in_phase(SessionPhase::Loop)?;

        let task = tokio::spawn(step_loop(
            self.role,
            client,
            player_id,
            self.handler.take(),
            self.config.chat_capacity,
            cancel.clone(),
        ));
        self.loop_task = Some(task);
        self.cancel = Some(cancel);
        self.state = SessionState::Looping;
        Ok(())
    }

    /// Waits for the step loop to finish, then leaves the match.
    ///
    /// Returns early if the run is cancelled while the loop is still
    /// inside an observation; the loop then stops on its own at its next
    /// iteration. Leaving is best effort: a failure is logged, not
    /// returned.
    pub async fn wait_end(&mut self) -> Result<(), PhaseError> {
        let mut task = self
            .loop_task
            .take()
            .ok_or(SessionError::InvalidState {
                operation: "wait_end",
                state: self.state,
            })
            .in_phase(SessionPhase::Wait)?;
        let mut cancel = self.cancel.take();

        let joined = match cancel.as_mut() {
            Some(cancel) => tokio::select! {
                biased;
                joined = &mut task => Some(joined),
                () = cancelled(cancel) => None,
            },
            None => Some(task.await),
        };

        let outcome = match joined {
            Some(Ok(exit)) => {
                self.handler = exit.handler;
                exit.result.in_phase(SessionPhase::Loop)
            }
            Some(Err(e)) => Err(PhaseError::new(
                SessionPhase::Wait,
                SessionError::LoopPanicked(e.to_string()),
            )),
            None => {
                tracing::info!(role = %self.role, "cancelled while waiting for match end");
                Ok(())
            }
        };
        self.state = SessionState::Ended;

        if let Some(client) = &self.client {
            if let Err(e) = client.leave_game().await {
                tracing::warn!(role = %self.role, error = %e, "leave failed");
            }
        }
        self.state = SessionState::LeftMatch;
        self.player_id = None;

        match &outcome {
            Ok(()) => tracing::info!(role = %self.role, "match ended"),
            Err(e) => tracing::error!(role = %self.role, error = %e, "match ended with error"),
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Quits the engine, closes the transport, and stops the engine
    /// process, in that order. Only what was set up is undone; calling this
    /// twice does nothing the second time.
    pub async fn shutdown(&mut self) {
        self.teardown.run().await;
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn transition(
        &self,
        target: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state.can_transition_to(target, self.role) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn begin_setup(
        &mut self,
        target: SessionState,
        operation: &'static str,
    ) -> Result<(), PhaseError> {
        self.transition(target, operation)
            .in_phase(SessionPhase::Setup)?;
        self.state = target;
        Ok(())
    }

    fn connected_client(
        &self,
        operation: &'static str,
        phase: SessionPhase,
    ) -> Result<Arc<RpcClient>, PhaseError> {
        self.client
            .clone()
            .ok_or(SessionError::InvalidState {
                operation,
                state: self.state,
            })
            .in_phase(phase)
    }
}

/// Resolves once `cancel` reads `true`. Never resolves if the sender is
/// gone without having cancelled.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

async fn step_loop(
    role: SessionRole,
    client: Arc<RpcClient>,
    player_id: u32,
    mut handler: Option<Box<dyn StepHandler>>,
    chat_capacity: usize,
    cancel: watch::Receiver<bool>,
) -> LoopExit {
    let mut inbox = ChatInbox::new(chat_capacity);
    let mut last_step = 0u32;

    if let Some(handler) = handler.as_mut() {
        handler.on_match_start(player_id).await;
    }
    tracing::debug!(%role, player_id, "step loop started");

    let result = loop {
        let cancelled = *cancel.borrow();
        if cancelled {
            tracing::info!(%role, "step loop cancelled");
            break Ok(());
        }

        let obs = match client.observation(RequestObservation::default()).await {
            Ok(obs) => obs,
            Err(e) => break Err(SessionError::Rpc(e)),
        };

        if !obs.player_result.is_empty() {
            tracing::info!(%role, step = obs.observation.game_loop, results = ?obs.player_result, "match over");
            if let Some(handler) = handler.as_mut() {
                handler.on_match_end(&obs.player_result).await;
            }
            break Ok(());
        }

        let Some(handler) = handler.as_mut() else {
            continue;
        };

        for chat in &obs.chat {
            inbox.push(chat.clone());
        }

        let step = obs.observation.game_loop;
        if step <= last_step {
            continue;
        }
        last_step = step;

        let sink = AbortSink::new();
        {
            let mut tick =
                StepTick::new(player_id, &obs, &client, &mut inbox, &sink);
            handler.on_step(&mut tick).await;
        }
        match sink.into_signal() {
            Some(Some(e)) => {
                tracing::info!(%role, step, error = %e, "step handler aborted");
                break Err(SessionError::Aborted(e));
            }
            Some(None) => {
                tracing::info!(%role, step, "step handler finished");
                break Ok(());
            }
            None => {}
        }
    };

    LoopExit { handler, result }
}
