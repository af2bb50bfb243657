//! Engine message bodies: one request/response pair per operation, plus the
//! small enums and records they reference.
//!
//! Optional wire fields are modelled as `Option` or defaulted collections
//! (`#[serde(default)]`), so an engine that omits a field still decodes.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared enums
// ---------------------------------------------------------------------------

/// A playable race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Race {
    NoRace,
    Terran,
    Zerg,
    Protoss,
    #[default]
    Random,
}

/// How a roster slot is controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerType {
    #[default]
    Participant,
    Computer,
    Observer,
}

/// Built-in AI difficulty (only meaningful for `PlayerType::Computer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    VeryEasy,
    #[default]
    Easy,
    Medium,
    MediumHard,
    Hard,
    Harder,
    VeryHard,
    CheatVision,
    CheatMoney,
    CheatInsane,
}

/// Built-in AI strategy (only meaningful for `PlayerType::Computer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiBuild {
    #[default]
    RandomBuild,
    Rush,
    Timing,
    Power,
    Macro,
    Air,
}

/// Final result for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Victory,
    Defeat,
    Tie,
    Undecided,
}

/// Engine lifecycle status reported alongside every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Launched,
    InitGame,
    InGame,
    InReplay,
    Ended,
    Quit,
    Unknown,
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPing {}

/// Handshake values reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePing {
    #[serde(default)]
    pub game_version: String,
    #[serde(default)]
    pub data_version: String,
    #[serde(default)]
    pub data_build: u32,
    #[serde(default)]
    pub base_build: u32,
}

// ---------------------------------------------------------------------------
// Create match
// ---------------------------------------------------------------------------

/// Which map to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapRef {
    /// Path relative to the engine's map directory, or absolute.
    LocalMap { map_path: String },
    /// A map published on the online service, by name.
    BattlenetMapName(String),
}

/// One roster slot in a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub player_type: PlayerType,
    pub race: Race,
    pub player_name: Option<String>,
    pub difficulty: Difficulty,
    pub ai_build: AiBuild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCreateGame {
    pub map: MapRef,
    pub player_setup: Vec<PlayerSetup>,
    #[serde(default)]
    pub disable_fog: bool,
    pub random_seed: Option<u32>,
    #[serde(default)]
    pub realtime: bool,
}

/// Error codes a create response may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateGameError {
    MissingMap,
    InvalidMapPath,
    InvalidMapData,
    InvalidMapName,
    InvalidMapHandle,
    MissingPlayerSetup,
    InvalidPlayerSetup,
    MultiplayerUnsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCreateGame {
    pub error: Option<CreateGameError>,
    pub error_details: Option<String>,
}

impl ResponseCreateGame {
    /// Returns `true` when the response does not block the match from
    /// proceeding.
    ///
    /// No error, and `MissingMap`, are informational: the engine reports
    /// `MissingMap` in flows where the map is supplied some other way.
    pub fn is_tolerated(&self) -> bool {
        matches!(self.error, None | Some(CreateGameError::MissingMap))
    }
}

// ---------------------------------------------------------------------------
// Join match
// ---------------------------------------------------------------------------

/// How the joining client takes part in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participation {
    /// Play as the given race.
    Race(Race),
    /// Watch from the perspective of an existing player.
    ObservedPlayerId(u32),
}

/// A game/base port pair used to wire up a multiplayer match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSet {
    pub game_port: u16,
    pub base_port: u16,
}

/// Which observation channels the client wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceOptions {
    pub raw: bool,
    pub score: bool,
}

impl Default for InterfaceOptions {
    fn default() -> Self {
        Self {
            raw: true,
            score: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestJoinGame {
    pub participation: Participation,
    #[serde(default)]
    pub options: InterfaceOptions,
    pub server_ports: Option<PortSet>,
    #[serde(default)]
    pub client_ports: Vec<PortSet>,
    pub player_name: Option<String>,
}

/// Error codes a join response may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinGameError {
    MissingParticipation,
    InvalidObservedPlayerId,
    MissingOptions,
    MissingPorts,
    GameFull,
    LaunchError,
    FeatureUnsupported,
    NoSpaceForUser,
    MapDoesNotExist,
    CannotOpenMap,
    ChecksumError,
    NetworkError,
    OtherError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseJoinGame {
    #[serde(default)]
    pub player_id: u32,
    pub error: Option<JoinGameError>,
    pub error_details: Option<String>,
}

impl ResponseJoinGame {
    /// Returns `true` when the join went through: no error, or the
    /// informational `MissingParticipation`.
    pub fn is_tolerated(&self) -> bool {
        matches!(self.error, None | Some(JoinGameError::MissingParticipation))
    }
}

// ---------------------------------------------------------------------------
// Restart / leave / quit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRestartGame {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartGameError {
    LaunchError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRestartGame {
    pub error: Option<RestartGameError>,
    pub error_details: Option<String>,
    #[serde(default)]
    pub need_hard_reset: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLeaveGame {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLeaveGame {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestQuit {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseQuit {}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// Advances a non-realtime match by `count` simulation loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStep {
    pub count: u32,
}

impl Default for RequestStep {
    fn default() -> Self {
        Self { count: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStep {
    #[serde(default)]
    pub simulation_loop: u32,
}

// ---------------------------------------------------------------------------
// Game info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGameInfo {}

/// Static information about one player in the running match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: u32,
    pub player_type: PlayerType,
    pub race_requested: Race,
    pub race_actual: Option<Race>,
    pub difficulty: Option<Difficulty>,
    pub ai_build: Option<AiBuild>,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseGameInfo {
    #[serde(default)]
    pub map_name: String,
    pub local_map_path: Option<String>,
    #[serde(default)]
    pub player_info: Vec<PlayerInfo>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Audience of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    Broadcast,
    Team,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChat {
    pub channel: ChatChannel,
    pub message: String,
}

/// One player action. Only the chat action is modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub action_chat: Option<ActionChat>,
}

impl Action {
    /// Builds a chat action.
    pub fn chat(channel: ChatChannel, message: impl Into<String>) -> Self {
        Self {
            action_chat: Some(ActionChat {
                channel,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAction {
    pub actions: Vec<Action>,
}

/// Per-action outcome. The engine reports `Success` for accepted actions;
/// any other value is an engine-defined rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAction {
    #[serde(default)]
    pub result: Vec<ActionResult>,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestObservation {
    #[serde(default)]
    pub disable_fog: bool,
    /// Block until the simulation reaches this loop (engine-side wait).
    pub game_loop: Option<u32>,
}

/// The part of an observation the session loop inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Simulation step counter.
    #[serde(default)]
    pub game_loop: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: u32,
    pub result: GameResult,
}

/// A chat message another player sent since the previous observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReceived {
    pub player_id: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseObservation {
    #[serde(default)]
    pub observation: Observation,
    /// Non-empty once the match is over.
    #[serde(default)]
    pub player_result: Vec<PlayerResult>,
    #[serde(default)]
    pub chat: Vec<ChatReceived>,
    #[serde(default)]
    pub actions: Vec<Action>,
}
