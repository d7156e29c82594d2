//! Collaborator seams: the voice transport and the audio player.
//!
//! Both are reached through traits so the actor can be driven by the HTTP
//! gateway client in production and by counting mocks in tests. Status events
//! flow the other way, into the actor handle.

use crate::audio::AudioSource;
use crate::errors::AgentError;
use async_trait::async_trait;
use common::types::VoiceEndpoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the transport assigns to one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the shared player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single live transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    /// Transport-assigned id; status events carry it.
    pub id: ConnectionId,
    /// Channel the session is attached to.
    pub endpoint: VoiceEndpoint,
}

/// A playable resource created from the audio source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResource {
    /// Player-assigned id.
    pub id: String,
}

/// Transport status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    /// Link negotiating, or self-healing after a drop.
    Connecting,
    /// Link usable.
    Ready,
    /// Link dropped unexpectedly.
    Disconnected,
    /// Session gone for good.
    Destroyed,
}

impl TransportStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportStatus::Connecting => "connecting",
            TransportStatus::Ready => "ready",
            TransportStatus::Disconnected => "disconnected",
            TransportStatus::Destroyed => "destroyed",
        }
    }
}

/// Player status events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Current resource finished or was exhausted.
    Idle,
    /// A resource is playing.
    Playing,
    /// Decode or stream fault.
    Error(String),
}

/// Transport layer: establishes and tears down the voice link.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Join the channel, returning a fresh handle.
    async fn join_channel(&self, endpoint: &VoiceEndpoint) -> Result<ConnectionHandle, AgentError>;

    /// Route the player's output into the connection.
    async fn subscribe(&self, handle: &ConnectionHandle, player: &PlayerId)
        -> Result<(), AgentError>;

    /// Tear the connection down.
    async fn destroy(&self, handle: &ConnectionHandle) -> Result<(), AgentError>;
}

/// Player primitive: created once and reused across connections.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// The player's id, used when subscribing it to a connection.
    fn player_id(&self) -> PlayerId;

    /// Build a streaming resource from the asset.
    async fn create_resource(&self, source: &AudioSource) -> Result<AudioResource, AgentError>;

    /// Start playing the resource.
    async fn play(&self, resource: AudioResource) -> Result<(), AgentError>;

    /// Stop whatever is playing.
    async fn stop(&self) -> Result<(), AgentError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status_wire_format() {
        let status: TransportStatus = serde_json::from_str("\"disconnected\"").unwrap();
        assert_eq!(status, TransportStatus::Disconnected);
        assert_eq!(
            serde_json::to_string(&TransportStatus::Ready).unwrap(),
            "\"ready\""
        );
        assert!(serde_json::from_str::<TransportStatus>("\"gone\"").is_err());
    }

    #[test]
    fn test_connection_id_is_transparent() {
        let id: ConnectionId = serde_json::from_str("\"conn-7\"").unwrap();
        assert_eq!(id, ConnectionId("conn-7".to_string()));
        assert_eq!(id.to_string(), "conn-7");
    }
}
