//! Typed engine calls.
//!
//! Every call follows the same path: build the request variant, send it,
//! wait for the matching response with the configured timeout, turn a
//! non-empty error list into [`RpcError::Application`], and unwrap the
//! result variant that belongs to the request.

use std::sync::Arc;
use std::time::Duration;

use enginelink_protocol::{
    Codec, JsonCodec, RequestAction, RequestCreateGame, RequestGameInfo,
    RequestJoinGame, RequestKind, RequestLeaveGame, RequestObservation,
    RequestPayload, RequestPing, RequestQuit, RequestRestartGame, RequestStep,
    ResponseAction, ResponseCreateGame, ResponseGameInfo, ResponseJoinGame,
    ResponseLeaveGame, ResponseObservation, ResponsePing, ResponseQuit,
    ResponseRestartGame, ResponseResult, ResponseStep,
};
use enginelink_transport::Connection;

use crate::{Correlator, RpcConfig, RpcError};

/// A client for one engine connection.
///
/// Cheap to share behind an `Arc`: all methods take `&self` and may be
/// called concurrently from several tasks.
pub struct RpcClient<C: Codec = JsonCodec> {
    correlator: Correlator<C>,
    timeout: Duration,
}

impl<C: Codec> RpcClient<C> {
    /// Creates a client over `conn`. Must be called inside a Tokio runtime.
    pub fn new(conn: Arc<dyn Connection>, codec: C, config: RpcConfig) -> Self {
        Self {
            correlator: Correlator::new(conn, codec),
            timeout: config.timeout,
        }
    }

    /// The correlator this client sends through.
    pub fn correlator(&self) -> &Correlator<C> {
        &self.correlator
    }

    /// The per-call response timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `payload` and returns the result of the matching kind.
    pub async fn call(
        &self,
        payload: RequestPayload,
    ) -> Result<ResponseResult, RpcError> {
        let kind = payload.kind();
        let id = self.correlator.send_request(payload).await?;
        let response =
            self.correlator.wait_for_response(id, self.timeout).await?;

        if !response.error.is_empty() {
            tracing::debug!(id, %kind, errors = ?response.error, "engine reported errors");
            return Err(RpcError::Application {
                kind,
                errors: response.error,
            });
        }

        match response.result {
            Some(result) if result.kind() == kind => Ok(result),
            other => Err(RpcError::UnexpectedResponse {
                expected: kind,
                got: other.map(|r| r.kind()),
            }),
        }
    }

    /// Liveness check; returns the engine's version values.
    pub async fn ping(&self) -> Result<ResponsePing, RpcError> {
        match self.call(RequestPayload::Ping(RequestPing {})).await? {
            ResponseResult::Ping(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::Ping, &other)),
        }
    }

    pub async fn create_game(
        &self,
        req: RequestCreateGame,
    ) -> Result<ResponseCreateGame, RpcError> {
        match self.call(RequestPayload::CreateGame(req)).await? {
            ResponseResult::CreateGame(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::CreateGame, &other)),
        }
    }

    /// Joins a created match. The engine holds the response until every
    /// participant has joined.
    pub async fn join_game(
        &self,
        req: RequestJoinGame,
    ) -> Result<ResponseJoinGame, RpcError> {
        match self.call(RequestPayload::JoinGame(req)).await? {
            ResponseResult::JoinGame(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::JoinGame, &other)),
        }
    }

    pub async fn leave_game(&self) -> Result<ResponseLeaveGame, RpcError> {
        match self
            .call(RequestPayload::LeaveGame(RequestLeaveGame {}))
            .await?
        {
            ResponseResult::LeaveGame(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::LeaveGame, &other)),
        }
    }

    pub async fn restart_game(
        &self,
    ) -> Result<ResponseRestartGame, RpcError> {
        match self
            .call(RequestPayload::RestartGame(RequestRestartGame {}))
            .await?
        {
            ResponseResult::RestartGame(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::RestartGame, &other)),
        }
    }

    pub async fn quit(&self) -> Result<ResponseQuit, RpcError> {
        match self.call(RequestPayload::Quit(RequestQuit {})).await? {
            ResponseResult::Quit(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::Quit, &other)),
        }
    }

    /// Advances a non-realtime match.
    pub async fn step(&self, req: RequestStep) -> Result<ResponseStep, RpcError> {
        match self.call(RequestPayload::Step(req)).await? {
            ResponseResult::Step(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::Step, &other)),
        }
    }

    pub async fn game_info(&self) -> Result<ResponseGameInfo, RpcError> {
        match self
            .call(RequestPayload::GameInfo(RequestGameInfo {}))
            .await?
        {
            ResponseResult::GameInfo(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::GameInfo, &other)),
        }
    }

    pub async fn action(
        &self,
        req: RequestAction,
    ) -> Result<ResponseAction, RpcError> {
        match self.call(RequestPayload::Action(req)).await? {
            ResponseResult::Action(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::Action, &other)),
        }
    }

    pub async fn observation(
        &self,
        req: RequestObservation,
    ) -> Result<ResponseObservation, RpcError> {
        match self.call(RequestPayload::Observation(req)).await? {
            ResponseResult::Observation(rsp) => Ok(rsp),
            other => Err(mismatch(RequestKind::Observation, &other)),
        }
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), RpcError> {
        self.correlator.close().await
    }
}

/// `call` already checked the kind, so this only fires if the two ever
/// disagree.
fn mismatch(expected: RequestKind, got: &ResponseResult) -> RpcError {
    RpcError::UnexpectedResponse {
        expected,
        got: Some(got.kind()),
    }
}
