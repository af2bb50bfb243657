//! Per-match engine sessions for enginelink.
//!
//! A [`GameSession`] drives one engine instance:
//!
//! 1. **Connect**: launch the engine ([`EngineLauncher`]), open an
//!    [`RpcClient`](enginelink_rpc::RpcClient), ping it
//! 2. **Setup**: the host creates and joins; the joiner joins
//! 3. **Loop**: poll observations, forward chat, call the
//!    [`StepHandler`] once per new simulation step
//! 4. **Wait**: collect the loop's outcome and leave the match
//!
//! Cleanup registered while connecting runs once, in reverse, on
//! [`GameSession::shutdown`] or when the session is dropped.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← runs a host and a joiner session side by side
//!     ↕
//! Session Layer (this crate)  ← lifecycle and step loop for one engine
//!     ↕
//! RPC Layer (below)  ← typed calls with id correlation
//! ```

mod bank;
mod config;
mod error;
mod handler;
mod launcher;
mod ports;
mod process;
mod session;
mod state;
mod teardown;

pub use bank::{Bank, BankError, BankValue, MemoryBank};
pub use config::{LaunchConfig, SessionConfig};
pub use error::{HandlerError, LaunchError, PhaseError, SessionError, SessionPhase};
pub use handler::{AbortSink, ChatInbox, StepHandler, StepTick};
pub use launcher::{EngineLauncher, LaunchedEngine, LocalLauncher};
pub use ports::{LocalPortProvider, PortAllocation, PortProvider};
pub use process::{EngineInstall, EngineProcess, LocalEngineProcess, parse_execute_info};
pub use session::{GameSession, MatchSetup};
pub use state::{SessionRole, SessionState};
