//! Ingress routes: commands and events forwarded by the voice gateway.
//!
//! - `POST /v1/commands/join` - join and play
//! - `POST /v1/commands/quit` - leave
//! - `POST /v1/events/transport` - connection status changes
//! - `POST /v1/events/player` - player status changes
//! - `POST /v1/events/voice-members` - membership snapshot of the channel
//! - `POST /v1/events/message` - chat message, answered by text triggers
//! - `GET /v1/status` - agent status snapshot
//!
//! All routes require the ingress bearer token. Events are accepted with 202
//! once the actor has them queued.

use super::auth::{require_ingress_token, IngressAuth};
use crate::actors::AgentActorHandle;
use crate::errors::AgentError;
use crate::observability::metrics;
use crate::state::{AgentStatus, ConnectOutcome, Member};
use crate::transport::{ConnectionId, PlayerStatus, TransportStatus};
use crate::triggers::TriggerTable;
use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// State shared by the ingress handlers.
#[derive(Clone)]
pub struct IngressState {
    pub agent: AgentActorHandle,
    pub triggers: Arc<TriggerTable>,
}

#[derive(Debug, Serialize)]
struct JoinResponse {
    ok: bool,
    outcome: ConnectOutcome,
}

#[derive(Debug, Serialize)]
struct QuitResponse {
    ok: bool,
    was_connected: bool,
}

#[derive(Debug, Deserialize)]
struct TransportEvent {
    connection_id: ConnectionId,
    status: TransportStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PlayerEventStatus {
    Idle,
    Playing,
    Error,
}

#[derive(Debug, Deserialize)]
struct PlayerEvent {
    status: PlayerEventStatus,
    #[serde(default)]
    reason: Option<String>,
}

impl From<PlayerEvent> for PlayerStatus {
    fn from(event: PlayerEvent) -> Self {
        match event.status {
            PlayerEventStatus::Idle => PlayerStatus::Idle,
            PlayerEventStatus::Playing => PlayerStatus::Playing,
            PlayerEventStatus::Error => {
                PlayerStatus::Error(event.reason.unwrap_or_else(|| "unknown".to_string()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MembersEvent {
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(default)]
    author_bot: bool,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    reply: Option<String>,
}

/// Build the ingress router.
///
/// Layer order: the auth check runs first, then request metrics around the
/// handler.
pub fn ingress_router(state: IngressState, auth: Arc<IngressAuth>) -> Router {
    Router::new()
        .route("/v1/commands/join", post(join_command))
        .route("/v1/commands/quit", post(quit_command))
        .route("/v1/events/transport", post(transport_event))
        .route("/v1/events/player", post(player_event))
        .route("/v1/events/voice-members", post(members_event))
        .route("/v1/events/message", post(message_event))
        .route("/v1/status", get(status))
        .with_state(state)
        .route_layer(middleware::from_fn(track_ingress))
        .route_layer(middleware::from_fn_with_state(auth, require_ingress_token))
}

/// Closed set of route labels for `va_ingress_requests_total`.
fn route_label(path: &str) -> &'static str {
    match path {
        "/v1/commands/join" => "join",
        "/v1/commands/quit" => "quit",
        "/v1/events/transport" => "transport_event",
        "/v1/events/player" => "player_event",
        "/v1/events/voice-members" => "members_event",
        "/v1/events/message" => "message_event",
        "/v1/status" => "status",
        _ => "other",
    }
}

async fn track_ingress(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or("other", |p| route_label(p.as_str()));

    let response = next.run(req).await;
    metrics::record_ingress_request(route, response.status().as_u16());
    response
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AgentError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        warn!(
            target: "va.gateway.ingress",
            error = %rejection,
            "Rejected malformed ingress body"
        );
        AgentError::BadRequest(rejection.body_text())
    })
}

/// Handler for POST /v1/commands/join
///
/// Joins the channel and starts playback. When the agent is already
/// connected it only makes sure playback is running.
#[instrument(skip_all, name = "va.gateway.ingress.join")]
async fn join_command(State(state): State<IngressState>) -> Result<Json<JoinResponse>, AgentError> {
    let outcome = state.agent.connect().await?;

    if outcome == ConnectOutcome::AlreadyConnected {
        if let Err(e) = state.agent.ensure_playing().await {
            warn!(
                target: "va.gateway.ingress",
                error = %e,
                "Join on live connection could not start playback"
            );
        }
    }

    info!(target: "va.gateway.ingress", outcome = ?outcome, "Join command handled");

    Ok(Json(JoinResponse { ok: true, outcome }))
}

/// Handler for POST /v1/commands/quit
#[instrument(skip_all, name = "va.gateway.ingress.quit")]
async fn quit_command(State(state): State<IngressState>) -> Result<Json<QuitResponse>, AgentError> {
    let was_connected = state.agent.disconnect().await?;

    info!(target: "va.gateway.ingress", was_connected, "Quit command handled");

    Ok(Json(QuitResponse {
        ok: true,
        was_connected,
    }))
}

async fn transport_event(
    State(state): State<IngressState>,
    payload: Result<Json<TransportEvent>, JsonRejection>,
) -> Result<StatusCode, AgentError> {
    let event = body(payload)?;
    state
        .agent
        .transport_status(event.connection_id, event.status)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn player_event(
    State(state): State<IngressState>,
    payload: Result<Json<PlayerEvent>, JsonRejection>,
) -> Result<StatusCode, AgentError> {
    let event = body(payload)?;
    state.agent.player_status(event.into()).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn members_event(
    State(state): State<IngressState>,
    payload: Result<Json<MembersEvent>, JsonRejection>,
) -> Result<StatusCode, AgentError> {
    let event = body(payload)?;
    state.agent.membership_changed(&event.members).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn message_event(
    State(state): State<IngressState>,
    payload: Result<Json<MessageEvent>, JsonRejection>,
) -> Result<Json<MessageResponse>, AgentError> {
    let event = body(payload)?;
    let reply = state
        .triggers
        .reply_for(event.author_bot, &event.content)
        .map(str::to_string);

    if reply.is_some() {
        info!(target: "va.gateway.ingress", "Text trigger matched");
    }

    Ok(Json(MessageResponse { reply }))
}

async fn status(State(state): State<IngressState>) -> Result<Json<AgentStatus>, AgentError> {
    Ok(Json(state.agent.get_status().await?))
}
