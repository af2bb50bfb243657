//! Wire protocol for enginelink.
//!
//! This crate defines what travels between a client and an engine:
//!
//! - **Envelope** ([`Request`], [`Response`]): the identifier, the error
//!   list, and a tagged union over the ten operations.
//! - **Messages** ([`RequestCreateGame`], [`ResponseObservation`], ...):
//!   the operation bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or correlation:
//!
//! ```text
//! Transport (frames) → Protocol (Request/Response) → RPC (id correlation)
//! ```

mod codec;
mod envelope;
mod error;
mod messages;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use envelope::{Request, RequestKind, RequestPayload, Response, ResponseResult};
pub use error::ProtocolError;
pub use messages::{
    Action, ActionChat, ActionResult, AiBuild, ChatChannel, ChatReceived,
    CreateGameError, Difficulty, GameResult, InterfaceOptions, JoinGameError,
    MapRef, Observation, Participation, PlayerInfo, PlayerResult, PlayerSetup,
    PlayerType, PortSet, Race, RequestAction, RequestCreateGame,
    RequestGameInfo, RequestJoinGame, RequestLeaveGame, RequestObservation,
    RequestPing, RequestQuit, RequestRestartGame, RequestStep, ResponseAction,
    ResponseCreateGame, ResponseGameInfo, ResponseJoinGame, ResponseLeaveGame,
    ResponseObservation, ResponsePing, ResponseQuit, ResponseRestartGame,
    ResponseStep, RestartGameError, Status,
};
