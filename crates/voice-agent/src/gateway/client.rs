//! Voice gateway HTTP client.
//!
//! The gateway sidecar holds the chat-platform session and exposes voice
//! connections and the audio player over HTTP. `GatewayClient` is the
//! transport layer; `GatewayPlayer` is the player primitive created once at
//! startup and shared across connections.
//!
//! # Security
//!
//! - Every request carries the agent's bearer token
//! - Timeouts prevent hanging on a stuck gateway
//! - Failures are logged here; callers only see a short fault kind

use crate::audio::AudioSource;
use crate::errors::AgentError;
use crate::transport::{
    AudioPlayer, AudioResource, ConnectionHandle, ConnectionId, PlayerId, VoiceTransport,
};
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::VoiceEndpoint;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Default timeout for gateway requests in seconds.
const GATEWAY_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connect timeout for gateway requests in seconds.
const GATEWAY_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Longest gateway-issued id accepted.
const MAX_GATEWAY_ID_LEN: usize = 128;

/// Gateway-issued ids are placed into URL paths verbatim, so only ids made of
/// ASCII letters, digits, `-` and `_` are accepted.
fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_GATEWAY_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Which collaborator a failed call belongs to.
#[derive(Debug, Clone, Copy)]
enum Side {
    Transport,
    Player,
}

impl Side {
    fn fault(self, kind: &str) -> AgentError {
        match self {
            Side::Transport => AgentError::Transport(kind.to_string()),
            Side::Player => AgentError::Playback(kind.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateConnectionResponse {
    connection_id: ConnectionId,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    player_id: &'a PlayerId,
}

#[derive(Debug, Deserialize)]
struct CreatePlayerResponse {
    player_id: PlayerId,
}

#[derive(Debug, Serialize)]
struct CreateResourceRequest {
    path: String,
}

#[derive(Debug, Deserialize)]
struct CreateResourceResponse {
    resource_id: String,
}

#[derive(Debug, Serialize)]
struct PlayRequest<'a> {
    resource_id: &'a str,
}

/// HTTP client for the voice gateway.
#[derive(Debug)]
pub struct GatewayClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Gateway base URL without trailing slash.
    base_url: String,

    /// Agent's bearer token for the gateway.
    token: SecretString,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GATEWAY_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(GATEWAY_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "va.gateway.client", error = %e, "Failed to build HTTP client");
                AgentError::Internal("failed to build HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with the bearer token and map the response status.
    async fn send(&self, side: Side, request: RequestBuilder) -> Result<Response, AgentError> {
        let response = request
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| {
                warn!(target: "va.gateway.client", error = %e, "Gateway request failed");
                side.fault("gateway unavailable")
            })?;

        Self::check_status(side, response).await
    }

    async fn check_status(side: Side, response: Response) -> Result<Response, AgentError> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status.is_server_error() {
            warn!(target: "va.gateway.client", status = %status, "Gateway returned server error");
            Err(side.fault("gateway unavailable"))
        } else if status.as_u16() == 403 {
            warn!(target: "va.gateway.client", status = %status, "Gateway denied the request");
            Err(side.fault("permission denied"))
        } else if status.as_u16() == 404 {
            Err(side.fault("not found"))
        } else if status.as_u16() == 400 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(target: "va.gateway.client", status = %status, body = %error_body, "Gateway returned bad request");
            Err(side.fault("request rejected"))
        } else if status.as_u16() == 401 {
            error!(target: "va.gateway.client", "Agent token rejected by gateway");
            Err(AgentError::Internal("gateway token rejected".to_string()))
        } else {
            warn!(target: "va.gateway.client", status = %status, "Unexpected gateway response");
            Err(AgentError::Internal(format!(
                "unexpected gateway status {status}"
            )))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AgentError> {
        response.json().await.map_err(|e| {
            error!(target: "va.gateway.client", error = %e, "Failed to parse gateway response");
            AgentError::Internal("invalid gateway response".to_string())
        })
    }
}

#[async_trait]
impl VoiceTransport for GatewayClient {
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    async fn join_channel(&self, endpoint: &VoiceEndpoint) -> Result<ConnectionHandle, AgentError> {
        let request = self
            .client
            .post(self.url("/v1/voice/connections"))
            .json(endpoint);
        let response = self.send(Side::Transport, request).await?;
        let body: CreateConnectionResponse = Self::parse(response).await?;

        if !is_path_safe_id(&body.connection_id.0) {
            error!(
                target: "va.gateway.client",
                connection_id = %body.connection_id,
                "Gateway returned an unusable connection id"
            );
            return Err(AgentError::Internal("invalid gateway response".to_string()));
        }

        debug!(
            target: "va.gateway.client",
            connection_id = %body.connection_id,
            "Voice connection created"
        );

        Ok(ConnectionHandle {
            id: body.connection_id,
            endpoint: *endpoint,
        })
    }

    #[instrument(skip_all, fields(connection_id = %handle.id, player_id = %player))]
    async fn subscribe(&self, handle: &ConnectionHandle, player: &PlayerId) -> Result<(), AgentError> {
        let request = self
            .client
            .post(self.url(&format!("/v1/voice/connections/{}/subscribe", handle.id)))
            .json(&SubscribeRequest { player_id: player });
        self.send(Side::Transport, request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(connection_id = %handle.id))]
    async fn destroy(&self, handle: &ConnectionHandle) -> Result<(), AgentError> {
        let request = self
            .client
            .delete(self.url(&format!("/v1/voice/connections/{}", handle.id)));

        match self.send(Side::Transport, request).await {
            // Already gone on the gateway side.
            Err(AgentError::Transport(kind)) if kind == "not found" => {
                debug!(
                    target: "va.gateway.client",
                    connection_id = %handle.id,
                    "Voice connection already destroyed"
                );
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }
}

/// The gateway's audio player, bound to one player id.
#[derive(Debug, Clone)]
pub struct GatewayPlayer {
    client: Arc<GatewayClient>,
    player_id: PlayerId,
}

impl GatewayPlayer {
    /// Create the player on the gateway.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Playback` if the gateway refuses or is unreachable.
    #[instrument(skip_all)]
    pub async fn create(client: Arc<GatewayClient>) -> Result<Self, AgentError> {
        let request = client.client.post(client.url("/v1/players"));
        let response = client.send(Side::Player, request).await?;
        let body: CreatePlayerResponse = GatewayClient::parse(response).await?;

        if !is_path_safe_id(&body.player_id.0) {
            error!(
                target: "va.gateway.client",
                player_id = %body.player_id,
                "Gateway returned an unusable player id"
            );
            return Err(AgentError::Internal("invalid gateway response".to_string()));
        }

        debug!(target: "va.gateway.client", player_id = %body.player_id, "Player created");

        Ok(Self {
            client,
            player_id: body.player_id,
        })
    }

    fn url(&self, suffix: &str) -> String {
        self.client
            .url(&format!("/v1/players/{}{}", self.player_id, suffix))
    }
}

#[async_trait]
impl AudioPlayer for GatewayPlayer {
    fn player_id(&self) -> PlayerId {
        self.player_id.clone()
    }

    #[instrument(skip_all, fields(player_id = %self.player_id))]
    async fn create_resource(&self, source: &AudioSource) -> Result<AudioResource, AgentError> {
        let request = self
            .client
            .client
            .post(self.url("/resources"))
            .json(&CreateResourceRequest {
                path: source.path().to_string_lossy().into_owned(),
            });
        let response = self.client.send(Side::Player, request).await?;
        let body: CreateResourceResponse = GatewayClient::parse(response).await?;

        Ok(AudioResource {
            id: body.resource_id,
        })
    }

    #[instrument(skip_all, fields(player_id = %self.player_id, resource_id = %resource.id))]
    async fn play(&self, resource: AudioResource) -> Result<(), AgentError> {
        let request = self
            .client
            .client
            .post(self.url("/play"))
            .json(&PlayRequest {
                resource_id: &resource.id,
            });
        self.client.send(Side::Player, request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(player_id = %self.player_id))]
    async fn stop(&self) -> Result<(), AgentError> {
        let request = self.client.client.post(self.url("/stop"));
        self.client.send(Side::Player, request).await?;
        Ok(())
    }
}
