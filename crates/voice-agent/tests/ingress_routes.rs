//! Tests for the ingress router against an agent wired to mocks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::secret::SecretString;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use voice_agent::gateway::{ingress_router, IngressAuth, IngressState};
use voice_agent::triggers::TriggerTable;
use voice_agent_test_utils::{settle, test_settings, TestAgent};

const TOKEN: &str = "ingress-token";

fn app(agent: &TestAgent) -> Router {
    ingress_router(
        IngressState {
            agent: agent.handle.clone(),
            triggers: Arc::new(TriggerTable::default()),
        },
        Arc::new(IngressAuth::new(SecretString::from(TOKEN))),
    )
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let agent = TestAgent::spawn(test_settings());

    let request = Request::builder()
        .method("POST")
        .uri("/v1/commands/join")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&agent), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
    assert_eq!(agent.transport.joins(), 0);
}

#[tokio::test]
async fn test_join_then_join_again() {
    let agent = TestAgent::spawn(test_settings());

    let (status, body) = post(app(&agent), "/v1/commands/join", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "outcome": "joined" }));

    let (status, body) = post(app(&agent), "/v1/commands/join", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "outcome": "already_connected" }));

    assert_eq!(agent.transport.joins(), 1);
}

#[tokio::test]
async fn test_join_failure_maps_to_bad_gateway() {
    let agent = TestAgent::spawn_with(
        test_settings(),
        voice_agent_test_utils::MockTransport::failing(),
        voice_agent_test_utils::MockPlayer::new(),
    );

    let (status, body) = post(app(&agent), "/v1/commands/join", json!({})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], json!("TRANSPORT_ERROR"));
    // The transport's detail stays in the logs.
    assert!(!body["message"].as_str().unwrap().contains("permission"));
}

#[tokio::test]
async fn test_quit_reports_whether_connected() {
    let agent = TestAgent::spawn(test_settings());

    let (_, _) = post(app(&agent), "/v1/commands/join", json!({})).await;

    let (status, body) = post(app(&agent), "/v1/commands/quit", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "was_connected": true }));

    let (_, body) = post(app(&agent), "/v1/commands/quit", json!({})).await;
    assert_eq!(body, json!({ "ok": true, "was_connected": false }));

    assert_eq!(agent.transport.destroys(), 1);
}

#[tokio::test]
async fn test_transport_event_accepted() {
    let agent = TestAgent::spawn(test_settings());
    let (_, _) = post(app(&agent), "/v1/commands/join", json!({})).await;

    let (status, _) = post(
        app(&agent),
        "/v1/events/transport",
        json!({ "connection_id": "conn-1", "status": "disconnected" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    let (_, body) = send(
        app(&agent),
        Request::builder()
            .uri("/v1/status")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["connection"], json!("disconnected"));
    assert_eq!(body["connection_id"], json!("conn-1"));
}

#[tokio::test]
async fn test_malformed_event_is_bad_request() {
    let agent = TestAgent::spawn(test_settings());

    let (status, body) = post(
        app(&agent),
        "/v1/events/transport",
        json!({ "connection_id": "conn-1", "status": "exploded" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn test_player_event_accepted() {
    let agent = TestAgent::spawn(test_settings());
    let (_, _) = post(app(&agent), "/v1/commands/join", json!({})).await;
    settle().await;
    assert_eq!(agent.player.plays(), 1);

    let (status, _) = post(app(&agent), "/v1/events/player", json!({ "status": "idle" })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    assert_eq!(agent.player.plays(), 2);
}

#[tokio::test]
async fn test_voice_members_event_updates_occupancy() {
    let agent = TestAgent::spawn(test_settings());

    let (status, _) = post(
        app(&agent),
        "/v1/events/voice-members",
        json!({ "members": [
            { "user_id": 1, "bot": false },
            { "user_id": 2 },
            { "user_id": 3, "bot": true }
        ] }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    let status = agent.handle.get_status().await.unwrap();
    assert_eq!(status.occupancy, 2);
    assert_eq!(agent.transport.joins(), 1);
}

#[tokio::test]
async fn test_message_event_answers_trigger() {
    let agent = TestAgent::spawn(test_settings());

    let (status, body) = post(
        app(&agent),
        "/v1/events/message",
        json!({ "author_bot": false, "content": "Play around the world!" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "reply": "Around the World 🌍🎶" }));

    let (_, body) = post(
        app(&agent),
        "/v1/events/message",
        json!({ "author_bot": true, "content": "around the world" }),
    )
    .await;
    assert_eq!(body, json!({ "reply": null }));

    let (_, body) = post(
        app(&agent),
        "/v1/events/message",
        json!({ "content": "hello" }),
    )
    .await;
    assert_eq!(body, json!({ "reply": null }));
}
