//! The request/response envelope: the only part of the wire format the
//! correlation layer looks at.
//!
//! ```text
//! Request  { id?, request: <one of ten operations> }
//! Response { id?, error: [..], status?, result: <same operation>? }
//! ```
//!
//! The `id` is stamped by the sender and echoed by the engine; it is how a
//! response finds its way back to the call that caused it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::{
    RequestAction, RequestCreateGame, RequestGameInfo, RequestJoinGame,
    RequestLeaveGame, RequestObservation, RequestPing, RequestQuit,
    RequestRestartGame, RequestStep, ResponseAction, ResponseCreateGame,
    ResponseGameInfo, ResponseJoinGame, ResponseLeaveGame,
    ResponseObservation, ResponsePing, ResponseQuit, ResponseRestartGame,
    ResponseStep, Status,
};

/// The ten operations of the engine protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Ping,
    CreateGame,
    JoinGame,
    LeaveGame,
    RestartGame,
    Quit,
    Step,
    GameInfo,
    Action,
    Observation,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "ping",
            Self::CreateGame => "create_game",
            Self::JoinGame => "join_game",
            Self::LeaveGame => "leave_game",
            Self::RestartGame => "restart_game",
            Self::Quit => "quit",
            Self::Step => "step",
            Self::GameInfo => "game_info",
            Self::Action => "action",
            Self::Observation => "observation",
        };
        f.write_str(name)
    }
}

/// Request body: exactly one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RequestPayload {
    Ping(RequestPing),
    CreateGame(RequestCreateGame),
    JoinGame(RequestJoinGame),
    LeaveGame(RequestLeaveGame),
    RestartGame(RequestRestartGame),
    Quit(RequestQuit),
    Step(RequestStep),
    GameInfo(RequestGameInfo),
    Action(RequestAction),
    Observation(RequestObservation),
}

impl RequestPayload {
    /// Which operation this payload invokes.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Ping(_) => RequestKind::Ping,
            Self::CreateGame(_) => RequestKind::CreateGame,
            Self::JoinGame(_) => RequestKind::JoinGame,
            Self::LeaveGame(_) => RequestKind::LeaveGame,
            Self::RestartGame(_) => RequestKind::RestartGame,
            Self::Quit(_) => RequestKind::Quit,
            Self::Step(_) => RequestKind::Step,
            Self::GameInfo(_) => RequestKind::GameInfo,
            Self::Action(_) => RequestKind::Action,
            Self::Observation(_) => RequestKind::Observation,
        }
    }
}

/// Response body: the result matching the request's operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResponseResult {
    Ping(ResponsePing),
    CreateGame(ResponseCreateGame),
    JoinGame(ResponseJoinGame),
    LeaveGame(ResponseLeaveGame),
    RestartGame(ResponseRestartGame),
    Quit(ResponseQuit),
    Step(ResponseStep),
    GameInfo(ResponseGameInfo),
    Action(ResponseAction),
    Observation(ResponseObservation),
}

impl ResponseResult {
    /// Which operation this result answers.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Ping(_) => RequestKind::Ping,
            Self::CreateGame(_) => RequestKind::CreateGame,
            Self::JoinGame(_) => RequestKind::JoinGame,
            Self::LeaveGame(_) => RequestKind::LeaveGame,
            Self::RestartGame(_) => RequestKind::RestartGame,
            Self::Quit(_) => RequestKind::Quit,
            Self::Step(_) => RequestKind::Step,
            Self::GameInfo(_) => RequestKind::GameInfo,
            Self::Action(_) => RequestKind::Action,
            Self::Observation(_) => RequestKind::Observation,
        }
    }
}

/// A request on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id. `None` until the RPC layer stamps it.
    pub id: Option<u32>,
    pub request: RequestPayload,
}

impl Request {
    /// Wraps a payload with no id yet.
    pub fn new(request: RequestPayload) -> Self {
        Self { id: None, request }
    }
}

/// A response on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the request's id.
    pub id: Option<u32>,
    /// Engine-reported errors. Empty means success.
    #[serde(default)]
    pub error: Vec<String>,
    pub status: Option<Status>,
    pub result: Option<ResponseResult>,
}

impl Response {
    /// A successful response carrying `result`.
    pub fn ok(id: Option<u32>, result: ResponseResult) -> Self {
        Self {
            id,
            error: Vec::new(),
            status: None,
            result: Some(result),
        }
    }

    /// A failed response carrying the engine's error list.
    pub fn failed(id: Option<u32>, error: Vec<String>) -> Self {
        Self {
            id,
            error,
            status: None,
            result: None,
        }
    }
}
