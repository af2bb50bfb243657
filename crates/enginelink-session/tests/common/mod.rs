//! A scripted fake engine reachable through an in-memory launcher.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use enginelink_protocol::{
    Action, ActionResult, ChatReceived, Codec, CreateGameError, GameResult,
    JoinGameError, JsonCodec, Observation, PlayerResult, Request,
    RequestPayload, Response, ResponseAction, ResponseCreateGame,
    ResponseGameInfo, ResponseJoinGame, ResponseLeaveGame,
    ResponseObservation, ResponsePing, ResponseQuit, ResponseRestartGame,
    ResponseResult, ResponseStep,
};
use enginelink_rpc::RpcConfig;
use enginelink_session::{
    EngineLauncher, EngineProcess, LaunchError, LaunchedEngine, SessionConfig,
};
use enginelink_transport::{Connection, MemoryConnection};

/// What the fake engine answers.
#[derive(Clone, Default)]
pub struct EngineScript {
    pub create_error: Option<CreateGameError>,
    pub join_error: Option<JoinGameError>,
    pub player_id: u32,
    /// Served in order; the last one repeats once the list is exhausted.
    pub observations: Vec<ResponseObservation>,
    /// Close the connection instead of answering observation number N
    /// (zero-based).
    pub hang_up_at_observation: Option<usize>,
}

/// Everything the fake engine and its process saw, in order.
#[derive(Clone, Default)]
pub struct EngineLog {
    events: Arc<Mutex<Vec<String>>>,
    actions: Arc<Mutex<Vec<Action>>>,
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

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// Polls until `event` shows up or a second passes.
    pub async fn wait_for(&self, event: &str) -> bool {
        for _ in 0..100 {
            if self.position(event).is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn observation(step: u32) -> ResponseObservation {
    ResponseObservation {
        observation: Observation { game_loop: step },
        ..Default::default()
    }
}

pub fn observation_with_chat(step: u32, messages: &[&str]) -> ResponseObservation {
    ResponseObservation {
        chat: messages
            .iter()
            .map(|m| ChatReceived {
                player_id: 2,
                message: m.to_string(),
            })
            .collect(),
        ..observation(step)
    }
}

pub fn final_observation(step: u32) -> ResponseObservation {
    ResponseObservation {
        player_result: vec![
            PlayerResult {
                player_id: 1,
                result: GameResult::Victory,
            },
            PlayerResult {
                player_id: 2,
                result: GameResult::Defeat,
            },
        ],
        ..observation(step)
    }
}

pub fn ping() -> ResponsePing {
    ResponsePing {
        game_version: "5.0.11".into(),
        data_version: "DATA".into(),
        data_build: 81009,
        base_build: 81009,
    }
}

/// Session config with no quit grace, so teardown is immediate.
pub fn quick_config() -> SessionConfig {
    SessionConfig {
        rpc: RpcConfig {
            timeout: Duration::from_secs(5),
        },
        quit_grace: Duration::ZERO,
        ..SessionConfig::default()
    }
}

// =========================================================================
// Engine task
// =========================================================================

async fn serve(conn: MemoryConnection, script: EngineScript, log: EngineLog) {
    let mut served = 0usize;
    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            _ => break,
        };
        let request: Request = JsonCodec.decode(&frame).unwrap();
        let kind = request.request.kind();
        log.record(format!("request:{kind}"));

        let result = match request.request {
            RequestPayload::Ping(_) => ResponseResult::Ping(ping()),
            RequestPayload::CreateGame(_) => {
                ResponseResult::CreateGame(ResponseCreateGame {
                    error: script.create_error,
                    error_details: script.create_error.map(|e| format!("{e:?}")),
                })
            }
            RequestPayload::JoinGame(_) => {
                ResponseResult::JoinGame(ResponseJoinGame {
                    player_id: script.player_id,
                    error: script.join_error,
                    error_details: None,
                })
            }
            RequestPayload::Observation(_) => {
                if script.hang_up_at_observation == Some(served) {
                    let _ = conn.close().await;
                    break;
                }
                let index = served.min(script.observations.len().saturating_sub(1));
                served += 1;
                ResponseResult::Observation(
                    script.observations.get(index).cloned().unwrap_or_default(),
                )
            }
            RequestPayload::Action(action) => {
                let results = action.actions.iter().map(|_| ActionResult::Success).collect();
                log.actions.lock().unwrap().extend(action.actions);
                ResponseResult::Action(ResponseAction { result: results })
            }
            RequestPayload::LeaveGame(_) => ResponseResult::LeaveGame(ResponseLeaveGame {}),
            RequestPayload::Quit(_) => ResponseResult::Quit(ResponseQuit {}),
            RequestPayload::RestartGame(_) => {
                ResponseResult::RestartGame(ResponseRestartGame::default())
            }
            RequestPayload::Step(_) => ResponseResult::Step(ResponseStep::default()),
            RequestPayload::GameInfo(_) => ResponseResult::GameInfo(ResponseGameInfo::default()),
        };

        let frame = JsonCodec.encode(&Response::ok(request.id, result)).unwrap();
        if conn.send(&frame).await.is_err() {
            break;
        }
    }
    log.record("engine:closed");
}

// =========================================================================
// Launcher and process
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

/// Launches a fake engine per call, all sharing one script and log.
pub struct MemoryLauncher {
    pub script: EngineScript,
    pub log: EngineLog,
    pub fail: bool,
}

impl MemoryLauncher {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            log: EngineLog::default(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(EngineScript::default())
        }
    }
}

#[async_trait]
impl EngineLauncher for MemoryLauncher {
    async fn launch(&self) -> Result<LaunchedEngine, LaunchError> {
        if self.fail {
            return Err(LaunchError::ExecutableNotFound("fake".into()));
        }
        let mut process = FakeProcess {
            log: self.log.clone(),
        };
        process.start().await?;

        let (client, engine) = MemoryConnection::pair();
        tokio::spawn(serve(engine, self.script.clone(), self.log.clone()));
        Ok(LaunchedEngine {
            connection: Arc::new(client),
            process: Some(Box::new(process)),
        })
    }
}
