//! Integration tests for the typed RPC client against a fake engine.

mod common;

use std::time::Duration;

use enginelink_protocol::{
    ChatChannel, CreateGameError, JsonCodec, MapRef, Action, ActionResult,
    Observation, PlayerResult, GameResult, RequestAction, RequestCreateGame,
    RequestKind, RequestObservation, RequestPayload, Response, ResponseAction,
    RequestStep, ResponseCreateGame, ResponseObservation, ResponsePing,
    ResponseQuit, ResponseRestartGame, ResponseResult, ResponseStep,
};
use enginelink_rpc::{RpcClient, RpcConfig, RpcError};

fn ping_values() -> ResponsePing {
    ResponsePing {
        game_version: "5.0.11.81009".into(),
        data_version: "0E7B4A4B5D4E5A5C".into(),
        data_build: 81009,
        base_build: 81009,
    }
}

#[tokio::test]
async fn test_ping_returns_engine_version_values() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        assert!(matches!(req.request, RequestPayload::Ping(_)));
        Response::ok(req.id, ResponseResult::Ping(ping_values()))
    });

    let rsp = client.ping().await.unwrap();
    assert_eq!(rsp, ping_values());
}

#[tokio::test]
async fn test_restart_game_sends_empty_request() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        assert!(matches!(req.request, RequestPayload::RestartGame(_)));
        Response::ok(
            req.id,
            ResponseResult::RestartGame(ResponseRestartGame {
                need_hard_reset: true,
                ..ResponseRestartGame::default()
            }),
        )
    });

    let rsp = client.restart_game().await.unwrap();
    assert!(rsp.need_hard_reset);
    assert!(rsp.error.is_none());
}

#[tokio::test]
async fn test_step_forwards_count_and_returns_loop() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        match &req.request {
            RequestPayload::Step(step) => assert_eq!(step.count, 2),
            other => panic!("expected step, got {other:?}"),
        }
        Response::ok(
            req.id,
            ResponseResult::Step(ResponseStep { simulation_loop: 44 }),
        )
    });

    let rsp = client.step(RequestStep { count: 2 }).await.unwrap();
    assert_eq!(rsp.simulation_loop, 44);
}

#[tokio::test]
async fn test_step_answered_with_other_kind_is_rejected() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        Response::ok(req.id, ResponseResult::Quit(ResponseQuit {}))
    });

    let err = client.step(RequestStep::default()).await.unwrap_err();
    assert!(matches!(
        err,
        RpcError::UnexpectedResponse {
            expected: RequestKind::Step,
            got: Some(RequestKind::Quit),
        }
    ));
}

#[tokio::test]
async fn test_error_list_becomes_application_error() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        Response::failed(req.id, vec!["Game has already ended".into(), "again".into()])
    });

    let err = client.leave_game().await.unwrap_err();
    match &err {
        RpcError::Application { kind, errors } => {
            assert_eq!(*kind, RequestKind::LeaveGame);
            assert_eq!(errors, &["Game has already ended", "again"]);
        }
        other => panic!("expected application error, got {other:?}"),
    }
    assert_eq!(err.application_errors().map(<[String]>::len), Some(2));

    // An application error leaves the transport usable.
    assert!(client.correlator().broken().is_none());
}

#[tokio::test]
async fn test_mismatched_result_kind_is_rejected() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        Response::ok(req.id, ResponseResult::Quit(ResponseQuit {}))
    });

    let err = client.game_info().await.unwrap_err();
    assert!(matches!(
        err,
        RpcError::UnexpectedResponse {
            expected: RequestKind::GameInfo,
            got: Some(RequestKind::Quit),
        }
    ));
}

#[tokio::test]
async fn test_missing_result_is_rejected() {
    let (client, engine) = common::client();
    engine.serve(|req| Response::failed(req.id, Vec::new()));

    let err = client.quit().await.unwrap_err();
    assert!(matches!(
        err,
        RpcError::UnexpectedResponse {
            expected: RequestKind::Quit,
            got: None,
        }
    ));
}

#[tokio::test]
async fn test_create_game_passes_error_code_through() {
    let (client, engine) = common::client();
    engine.serve(|req| {
        let RequestPayload::CreateGame(create) = &req.request else {
            panic!("expected create request");
        };
        assert!(create.realtime);
        Response::ok(
            req.id,
            ResponseResult::CreateGame(ResponseCreateGame {
                error: Some(CreateGameError::MissingMap),
                error_details: Some("map supplied later".into()),
            }),
        )
    });

    let rsp = client
        .create_game(RequestCreateGame {
            map: MapRef::LocalMap {
                map_path: "Test.SC2Map".into(),
            },
            player_setup: Vec::new(),
            disable_fog: false,
            random_seed: Some(7),
            realtime: true,
        })
        .await
        .unwrap();
    assert_eq!(rsp.error, Some(CreateGameError::MissingMap));
    assert!(rsp.is_tolerated());
}

#[tokio::test]
async fn test_observation_and_action_round_trip() {
    let (client, engine) = common::client();
    engine.serve(|req| match req.request {
        RequestPayload::Observation(_) => Response::ok(
            req.id,
            ResponseResult::Observation(ResponseObservation {
                observation: Observation { game_loop: 50 },
                player_result: vec![PlayerResult {
                    player_id: 1,
                    result: GameResult::Victory,
                }],
                ..Default::default()
            }),
        ),
        RequestPayload::Action(action) => Response::ok(
            req.id,
            ResponseResult::Action(ResponseAction {
                result: action
                    .actions
                    .iter()
                    .map(|_| ActionResult::Success)
                    .collect(),
            }),
        ),
        other => panic!("unexpected request {other:?}"),
    });

    let obs = client
        .observation(RequestObservation::default())
        .await
        .unwrap();
    assert_eq!(obs.observation.game_loop, 50);
    assert_eq!(obs.player_result.len(), 1);

    let rsp = client
        .action(RequestAction {
            actions: vec![Action::chat(ChatChannel::Broadcast, "gg")],
        })
        .await
        .unwrap();
    assert_eq!(rsp.result, vec![ActionResult::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_client_applies_configured_timeout() {
    let (conn, engine) = common::connect();
    let client = RpcClient::new(
        conn,
        JsonCodec,
        RpcConfig {
            timeout: Duration::from_secs(2),
        },
    );
    assert_eq!(client.timeout(), Duration::from_secs(2));

    // Keep the engine end open but never answer.
    let _engine = engine;
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout { after, .. } if after == Duration::from_secs(2)));
}

#[test]
fn test_default_timeout_is_thirty_seconds() {
    assert_eq!(RpcConfig::default().timeout, Duration::from_secs(30));
}
