//! Fake engines for coordinator runs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use enginelink::protocol::{
    AiBuild, Codec, CreateGameError, Difficulty, GameResult, JoinGameError, JsonCodec, MapRef,
    Observation, PlayerResult, PlayerSetup, PlayerType, Race, Request, RequestPayload,
    Response, ResponseCreateGame, ResponseJoinGame, ResponseLeaveGame,
    ResponseObservation, ResponsePing, ResponseQuit, ResponseResult,
};
use enginelink::rpc::RpcConfig;
use enginelink::session::{
    EngineLauncher, EngineProcess, LaunchError, LaunchedEngine, PortProvider,
    SessionConfig,
};
use enginelink::transport::{Connection, MemoryConnection};

/// How every launched engine answers.
#[derive(Clone, Default)]
pub struct EngineScript {
    pub create_error: Option<CreateGameError>,
    pub join_error: Option<JoinGameError>,
    /// Observation steps served after each join; the match ends after the
    /// last one.
    pub steps: Vec<u32>,
    /// The launch itself fails.
    pub fail_launch: bool,
    /// JoinGame is recorded but never answered.
    pub hold_join: bool,
}

impl EngineScript {
    pub fn short_matches() -> Self {
        Self {
            steps: vec![1, 2],
            ..Self::default()
        }
    }
}

/// Events from all launched engines, in arrival order.
#[derive(Clone, Default)]
pub struct EngineLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EngineLog {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Polls until `event` was seen `times` times or two seconds pass.
    pub async fn wait_for_count(&self, event: &str, times: usize) -> bool {
        for _ in 0..200 {
            if self.count(event) >= times {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn player(name: &str) -> PlayerSetup {
    PlayerSetup {
        player_type: PlayerType::Participant,
        race: Race::Terran,
        player_name: Some(name.into()),
        difficulty: Difficulty::default(),
        ai_build: AiBuild::default(),
    }
}

pub fn quick_config() -> SessionConfig {
    SessionConfig {
        rpc: RpcConfig {
            timeout: Duration::from_secs(5),
        },
        quit_grace: Duration::ZERO,
        ..SessionConfig::default()
    }
}

/// Hands out consecutive port numbers.
pub struct SequentialPorts(AtomicU16);

impl SequentialPorts {
    pub fn starting_at(port: u16) -> Arc<Self> {
        Arc::new(Self(AtomicU16::new(port)))
    }
}

#[async_trait]
impl PortProvider for SequentialPorts {
    async fn allocate(&self) -> Result<u16, LaunchError> {
        Ok(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

// =========================================================================
// Engine task
// =========================================================================

fn observation(step: u32, last: bool) -> ResponseObservation {
    let player_result = if last {
        vec![
            PlayerResult {
                player_id: 1,
                result: GameResult::Tie,
            },
            PlayerResult {
                player_id: 2,
                result: GameResult::Tie,
            },
        ]
    } else {
        Vec::new()
    };
    ResponseObservation {
        observation: Observation { game_loop: step },
        player_result,
        ..Default::default()
    }
}

async fn serve(conn: MemoryConnection, script: EngineScript, log: EngineLog) {
    let mut served = 0usize;
    let mut hosted = false;
    while let Ok(Some(frame)) = conn.recv().await {
        let request: Request = JsonCodec.decode(&frame).unwrap();

        let result = match request.request {
            RequestPayload::Ping(_) => ResponseResult::Ping(ResponsePing {
                game_version: "5.0.11".into(),
                data_version: "DATA".into(),
                data_build: 81009,
                base_build: 81009,
            }),
            RequestPayload::CreateGame(create) => {
                let name = match create.map {
                    MapRef::LocalMap { map_path } => map_path,
                    MapRef::BattlenetMapName(name) => name,
                };
                log.record(format!("create:{name}"));
                hosted = true;
                ResponseResult::CreateGame(ResponseCreateGame {
                    error: script.create_error,
                    error_details: None,
                })
            }
            RequestPayload::JoinGame(join) => {
                let port = join.server_ports.map_or(0, |p| p.game_port);
                let client = join.client_ports.first().map_or(0, |p| p.game_port);
                log.record(format!("join:{port}"));
                log.record(format!(
                    "seat:{}:{}:{port}:{client}",
                    if hosted { "host" } else { "joiner" },
                    join.player_name.as_deref().unwrap_or("-"),
                ));
                served = 0;
                if script.hold_join {
                    continue;
                }
                ResponseResult::JoinGame(ResponseJoinGame {
                    player_id: 1,
                    error: script.join_error,
                    error_details: None,
                })
            }
            RequestPayload::Observation(_) => {
                let index = served.min(script.steps.len().saturating_sub(1));
                served += 1;
                let step = script.steps.get(index).copied().unwrap_or(1);
                let last = index + 1 >= script.steps.len();
                ResponseResult::Observation(observation(step, last))
            }
            RequestPayload::LeaveGame(_) => {
                log.record("leave");
                ResponseResult::LeaveGame(ResponseLeaveGame {})
            }
            RequestPayload::Quit(_) => {
                log.record("quit");
                ResponseResult::Quit(ResponseQuit {})
            }
            other => panic!("unexpected request: {}", other.kind()),
        };

        let frame = JsonCodec.encode(&Response::ok(request.id, result)).unwrap();
        if conn.send(&frame).await.is_err() {
            break;
        }
    }
}

// =========================================================================
// Launcher
// =========================================================================

struct FakeProcess {
    log: EngineLog,
}

#[async_trait]
impl EngineProcess for FakeProcess {
    async fn start(&mut self) -> Result<u32, LaunchError> {
        self.log.record("process:start");
        Ok(4242)
    }

    async fn stop(&mut self) -> Result<(), LaunchError> {
        self.log.record("process:stop");
        Ok(())
    }
}

/// Launches in-memory engines. The n-th launch follows the n-th script;
/// launches past the end reuse the last one.
pub struct MemoryLauncher {
    scripts: Vec<EngineScript>,
    launches: AtomicUsize,
    pub log: EngineLog,
}

impl MemoryLauncher {
    pub fn new(script: EngineScript) -> Arc<Self> {
        Self::sequence(vec![script])
    }

    pub fn sequence(scripts: Vec<EngineScript>) -> Arc<Self> {
        Arc::new(Self {
            scripts,
            launches: AtomicUsize::new(0),
            log: EngineLog::default(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::new(EngineScript {
            fail_launch: true,
            ..EngineScript::default()
        })
    }
}

#[async_trait]
impl EngineLauncher for MemoryLauncher {
    async fn launch(&self) -> Result<LaunchedEngine, LaunchError> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .get(n)
            .or(self.scripts.last())
            .cloned()
            .unwrap_or_default();
        if script.fail_launch {
            return Err(LaunchError::ExecutableNotFound("fake".into()));
        }
        let mut process = FakeProcess {
            log: self.log.clone(),
        };
        process.start().await?;

        let (client, engine) = MemoryConnection::pair();
        tokio::spawn(serve(engine, script, self.log.clone()));
        Ok(LaunchedEngine {
            connection: Arc::new(client),
            process: Some(Box::new(process)),
        })
    }
}
