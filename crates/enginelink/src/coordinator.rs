//! Two sessions, one per role, playing a rotation of matches together.
//!
//! Each session runs on its own task. For every match both tasks fetch the
//! same [`PortAllocation`] from a shared ledger; the host installs the map
//! and creates the match, both join, and both drive their step loops until
//! the match ends. The rotation wraps around the map list. It stops before
//! the next match once the run is cancelled, or once either session has
//! failed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use enginelink_protocol::PlayerSetup;
use enginelink_session::{
    EngineInstall, EngineLauncher, GameSession, LaunchConfig, LaunchError, LocalLauncher,
    LocalPortProvider, MatchSetup, PhaseError, PortAllocation, PortProvider,
    SessionError, SessionPhase, SessionRole, StepHandler,
};
use tokio::sync::{Mutex, watch};

use crate::{CoordinatorConfig, CoordinatorError, GameMap};

/// One side of the match: its roster entry and, optionally, the handler
/// that plays it.
pub struct Participant {
    pub setup: PlayerSetup,
    pub handler: Option<Box<dyn StepHandler>>,
}

impl Participant {
    pub fn new(setup: PlayerSetup) -> Self {
        Self {
            setup,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: impl StepHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }
}

/// Port allocations keyed by match index.
///
/// Whichever worker reaches a match first allocates; the second fetch
/// hands out the same allocation and forgets it.
#[derive(Default)]
struct PortLedger {
    matches: Mutex<HashMap<usize, PortAllocation>>,
}

impl PortLedger {
    async fn ports_for(
        &self,
        index: usize,
        provider: &dyn PortProvider,
    ) -> Result<PortAllocation, LaunchError> {
        let mut matches = self.matches.lock().await;
        if let Some(ports) = matches.remove(&index) {
            return Ok(ports);
        }
        let ports = PortAllocation::allocate(provider).await?;
        matches.insert(index, ports);
        Ok(ports)
    }
}

/// Settings fixed at build time.
struct Shared {
    config: CoordinatorConfig,
    launch_config: LaunchConfig,
    launcher: Arc<dyn EngineLauncher>,
    ports: Arc<dyn PortProvider>,
}

/// State owned by a single call to [`Coordinator::run`].
struct RunState {
    ledger: PortLedger,
    halted: AtomicBool,
    maps_dir: Option<PathBuf>,
}

/// Builder for a [`Coordinator`].
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = Coordinator::builder()
///     .config(CoordinatorConfig::default())
///     .launch_config(LaunchConfig::default())
///     .build();
/// coordinator.run(maps, [host, joiner], cancel).await?;
/// ```
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    launch_config: LaunchConfig,
    launcher: Option<Arc<dyn EngineLauncher>>,
    ports: Option<Arc<dyn PortProvider>>,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            launch_config: LaunchConfig::default(),
            launcher: None,
            ports: None,
        }
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Settings for the default [`LocalLauncher`], also used to find the
    /// maps directory when none is configured.
    pub fn launch_config(mut self, config: LaunchConfig) -> Self {
        self.launch_config = config;
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn EngineLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Where match ports come from. Defaults to a [`LocalPortProvider`] on
    /// the launch host.
    pub fn ports(mut self, ports: Arc<dyn PortProvider>) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn build(self) -> Coordinator {
        let ports = self.ports.unwrap_or_else(|| {
            Arc::new(LocalPortProvider::new(self.launch_config.host.clone()))
        });
        let launcher = self.launcher.unwrap_or_else(|| {
            Arc::new(LocalLauncher::new(self.launch_config.clone()))
        });

        Coordinator {
            shared: Arc::new(Shared {
                config: self.config,
                launch_config: self.launch_config,
                launcher,
                ports,
            }),
        }
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a host session and a joiner session side by side.
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    /// Plays `maps` in rotation with `players[0]` hosting and `players[1]`
    /// joining, until `cancel` turns `true` or a session fails.
    ///
    /// Both sessions always run to completion and are shut down before
    /// this returns. If either failed, the error carries both outcomes.
    /// Concurrent runs on one coordinator are independent of each other.
    pub async fn run(
        &self,
        maps: Vec<GameMap>,
        players: [Participant; 2],
        cancel: watch::Receiver<bool>,
    ) -> Result<(), CoordinatorError> {
        if maps.is_empty() {
            return Err(CoordinatorError::NoMaps);
        }
        let run = Arc::new(RunState {
            ledger: PortLedger::default(),
            halted: AtomicBool::new(false),
            maps_dir: self.maps_dir(&maps).await?,
        });

        let maps: Arc<[GameMap]> = maps.into();
        let [host, joiner] = players;
        let roster = vec![host.setup, joiner.setup];

        let spawn_worker = |role, handler| {
            tokio::spawn(run_worker(
                role,
                Arc::clone(&self.shared),
                Arc::clone(&run),
                Arc::clone(&maps),
                roster.clone(),
                handler,
                cancel.clone(),
            ))
        };
        let host_task = spawn_worker(SessionRole::Host, host.handler);
        let joiner_task = spawn_worker(SessionRole::Joiner, joiner.handler);

        let (host, joiner) = tokio::join!(host_task, joiner_task);
        let host = flatten(host).err();
        let joiner = flatten(joiner).err();

        if host.is_none() && joiner.is_none() {
            tracing::info!("both sessions ended cleanly");
            return Ok(());
        }
        Err(CoordinatorError::Sessions { host, joiner })
    }

    /// The configured maps directory, or the located install's when a map
    /// needs installing and none is configured.
    async fn maps_dir(&self, maps: &[GameMap]) -> Result<Option<PathBuf>, CoordinatorError> {
        if let Some(dir) = &self.shared.config.maps_dir {
            return Ok(Some(dir.clone()));
        }
        let Some(map) = maps.iter().find(|m| m.needs_install()) else {
            return Ok(None);
        };
        let install = EngineInstall::locate(&self.shared.launch_config)
            .await
            .map_err(|source| CoordinatorError::NoMapsDir {
                map: map.name.clone(),
                source,
            })?;
        let dir = install.maps_dir();
        tracing::debug!(maps_dir = %dir.display(), "using install maps directory");
        Ok(Some(dir))
    }
}

fn flatten(
    joined: Result<Result<(), PhaseError>, tokio::task::JoinError>,
) -> Result<(), PhaseError> {
    joined.unwrap_or_else(|e| {
        Err(PhaseError::new(
            SessionPhase::Wait,
            SessionError::LoopPanicked(e.to_string()),
        ))
    })
}

/// Drives one session through the rotation, then shuts it down.
async fn run_worker(
    role: SessionRole,
    shared: Arc<Shared>,
    run: Arc<RunState>,
    maps: Arc<[GameMap]>,
    roster: Vec<PlayerSetup>,
    handler: Option<Box<dyn StepHandler>>,
    cancel: watch::Receiver<bool>,
) -> Result<(), PhaseError> {
    let mut session = GameSession::new(role, shared.config.session.clone());
    session.set_handler(handler);

    let result = play_rotation(&mut session, &shared, &run, &maps, roster, cancel).await;
    if let Err(e) = &result {
        run.halted.store(true, Ordering::SeqCst);
        tracing::error!(%role, error = %e, "session failed");
    }

    session.shutdown().await;
    result
}

async fn play_rotation(
    session: &mut GameSession,
    shared: &Shared,
    run: &RunState,
    maps: &[GameMap],
    roster: Vec<PlayerSetup>,
    cancel: watch::Receiver<bool>,
) -> Result<(), PhaseError> {
    let role = session.role();
    let ping = session.connect(shared.launcher.as_ref()).await?;
    tracing::info!(%role, version = %ping.game_version, "session connected");

    let mut index = 0usize;
    loop {
        let cancelled = *cancel.borrow();
        if cancelled {
            tracing::info!(%role, matches = index, "rotation cancelled");
            return Ok(());
        }
        // The other side failed; it will not be there for the next match.
        if run.halted.load(Ordering::SeqCst) {
            tracing::info!(%role, matches = index, "rotation halted");
            return Ok(());
        }

        let map = &maps[index % maps.len()];
        let ports = run
            .ledger
            .ports_for(index, shared.ports.as_ref())
            .await
            .map_err(|e| PhaseError::new(SessionPhase::Setup, e))?;
        let setup = MatchSetup {
            map: map.map_ref(),
            roster: roster.clone(),
            ports,
            disable_fog: shared.config.disable_fog,
            realtime: shared.config.realtime,
        };
        tracing::info!(%role, index, map = %map.name, "match starting");

        let player_id = match role {
            SessionRole::Host => {
                if let Some(dir) = &run.maps_dir {
                    map.install(dir)
                        .await
                        .map_err(|e| PhaseError::new(SessionPhase::Setup, e))?;
                }
                session.host_setup(&setup).await?
            }
            SessionRole::Joiner => session.join_setup(&setup).await?,
        };
        tracing::debug!(%role, index, player_id, "joined");

        session.start_loop(cancel.clone())?;
        session.wait_end().await?;
        index += 1;
    }
}
