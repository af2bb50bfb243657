//! Request/response RPC for enginelink.
//!
//! - [`Correlator`]: identifier generation, the pending-call table, and the
//!   background receive loop that routes each response to its caller.
//! - [`RpcClient`]: one typed method per engine operation on top of the
//!   correlator.
//!
//! ```text
//! RpcClient::observation() ─> Correlator::send_request ─> Connection::send
//!                          <─ Correlator::wait_for_response <─ receive loop
//! ```

mod client;
mod config;
mod correlator;
mod error;

pub use client::RpcClient;
pub use config::RpcConfig;
pub use correlator::Correlator;
pub use error::{BrokenCause, RpcError};
