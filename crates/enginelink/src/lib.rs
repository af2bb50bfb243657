//! # enginelink
//!
//! Client framework for driving real-time strategy engines over their
//! WebSocket API.
//!
//! A [`Coordinator`] launches two engine instances, has one host a match
//! and the other join it, and runs a [`StepHandler`] for each side once
//! per simulation step. Matches repeat over a rotation of maps until the
//! run is cancelled or a side fails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enginelink::prelude::*;
//!
//! # async fn demo(host: PlayerSetup, joiner: PlayerSetup) -> Result<(), EngineLinkError> {
//! let (_stop, cancel) = tokio::sync::watch::channel(false);
//! let coordinator = Coordinator::builder().build();
//! coordinator
//!     .run(
//!         vec![GameMap::installed("Arena.SC2Map")],
//!         [Participant::new(host), Participant::new(joiner)],
//!         cancel,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! enginelink            Coordinator, maps, unified error
//! enginelink-session    GameSession, StepHandler, launcher, teardown
//! enginelink-rpc        Correlator, RpcClient
//! enginelink-protocol   envelope, messages, codec
//! enginelink-transport  Connection, WebSocket, in-memory pair
//! ```

mod config;
mod coordinator;
mod error;
mod maps;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder, Participant};
pub use error::{CoordinatorError, EngineLinkError};
pub use maps::GameMap;

pub use enginelink_protocol as protocol;
pub use enginelink_rpc as rpc;
pub use enginelink_session as session;
pub use enginelink_transport as transport;

pub mod prelude {
    pub use crate::{
        Coordinator, CoordinatorConfig, CoordinatorError, EngineLinkError,
        GameMap, Participant,
    };
    pub use enginelink_protocol::{
        Action, ActionChat, ChatChannel, Difficulty, Observation, PlayerResult,
        PlayerSetup, PlayerType, Race,
    };
    pub use enginelink_rpc::{RpcClient, RpcConfig, RpcError};
    pub use enginelink_session::{
        EngineInstall, LaunchConfig, SessionConfig, SessionRole, StepHandler,
        StepTick,
    };
}
