//! Voice agent error types.
//!
//! `AgentError` is the only error that crosses the core boundary. Collaborators
//! see it as a success/failure flag plus a short kind; details are logged where
//! the fault happens. Ingress responses use generic messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Voice agent error type.
///
/// Maps to HTTP status codes on the ingress:
/// - `Transport`, `Playback`: 502 Bad Gateway
/// - `NotConnected`, `Superseded`: 409 Conflict
/// - `ShuttingDown`: 503 Service Unavailable
/// - `Unauthorized`: 401 Unauthorized
/// - `BadRequest`: 400 Bad Request
/// - `Config`, `Internal`: 500 Internal Server Error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Transport-layer fault (join failure, permission denial, gateway down).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Player fault (resource creation or play call failed).
    #[error("Playback error: {0}")]
    Playback(String),

    /// Playback requested while no connection exists.
    #[error("Not connected")]
    NotConnected,

    /// A pending connect was cancelled by a later disconnect.
    #[error("Superseded by a newer request")]
    Superseded,

    /// The agent is shutting down.
    #[error("Agent is shutting down")]
    ShuttingDown,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingress bearer token missing or wrong.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed ingress request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error (actor channel failure, unexpected gateway response).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Short machine-readable code, also used as a metric label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            AgentError::Transport(_) => "TRANSPORT_ERROR",
            AgentError::Playback(_) => "PLAYBACK_ERROR",
            AgentError::NotConnected => "NOT_CONNECTED",
            AgentError::Superseded => "SUPERSEDED",
            AgentError::ShuttingDown => "SHUTTING_DOWN",
            AgentError::Config(_) => "CONFIG_ERROR",
            AgentError::Unauthorized(_) => "UNAUTHORIZED",
            AgentError::BadRequest(_) => "BAD_REQUEST",
            AgentError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::Transport(_) | AgentError::Playback(_) => StatusCode::BAD_GATEWAY,
            AgentError::NotConnected | AgentError::Superseded => StatusCode::CONFLICT,
            AgentError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AgentError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::Config(_) | AgentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            AgentError::Transport(_) => "Could not reach the voice channel".to_string(),
            AgentError::Playback(_) => "Could not start playback".to_string(),
            AgentError::NotConnected => "Not connected to a voice channel".to_string(),
            AgentError::Superseded => "Request was superseded".to_string(),
            AgentError::ShuttingDown => "Agent is shutting down".to_string(),
            AgentError::Unauthorized(_) => "Invalid or missing token".to_string(),
            AgentError::BadRequest(reason) => reason.clone(),
            AgentError::Config(_) | AgentError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    ok: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        match &self {
            AgentError::Config(detail) | AgentError::Internal(detail) => {
                tracing::error!(target: "va.errors", error = %detail, "Internal error");
            }
            AgentError::Transport(detail) | AgentError::Playback(detail) => {
                tracing::warn!(target: "va.errors", code = self.code(), error = %detail, "Request failed");
            }
            _ => {}
        }

        let status = self.status_code();
        let body = ErrorResponse {
            ok: false,
            code: self.code(),
            message: self.client_message(),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"voice-agent\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
