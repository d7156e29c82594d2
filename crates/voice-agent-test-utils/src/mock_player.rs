//! Mock audio player.
//!
//! Counts resource creations, play calls and stop calls. Play calls can be
//! made to fail at runtime to exercise the error-retry path.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use voice_agent::audio::AudioSource;
use voice_agent::errors::AgentError;
use voice_agent::transport::{AudioPlayer, AudioResource, PlayerId};

/// Id reported by every `MockPlayer`.
pub const MOCK_PLAYER_ID: &str = "mock-player";

/// Mock player for agent tests.
#[derive(Debug, Default)]
pub struct MockPlayer {
    fail_plays: AtomicBool,
    resources: AtomicUsize,
    plays: AtomicUsize,
    stops: AtomicUsize,
}

impl MockPlayer {
    /// Create a player whose calls all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a player whose play calls fail.
    #[must_use]
    pub fn failing() -> Self {
        let player = Self::default();
        player.set_play_failure(true);
        player
    }

    /// Switch play failures on or off.
    pub fn set_play_failure(&self, fail: bool) {
        self.fail_plays.store(fail, Ordering::SeqCst);
    }

    /// Number of resources created.
    #[must_use]
    pub fn resources(&self) -> usize {
        self.resources.load(Ordering::SeqCst)
    }

    /// Number of play calls, failed ones included.
    #[must_use]
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// Number of stop calls.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioPlayer for MockPlayer {
    fn player_id(&self) -> PlayerId {
        PlayerId(MOCK_PLAYER_ID.to_string())
    }

    async fn create_resource(&self, _source: &AudioSource) -> Result<AudioResource, AgentError> {
        let n = self.resources.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AudioResource {
            id: format!("res-{n}"),
        })
    }

    async fn play(&self, _resource: AudioResource) -> Result<(), AgentError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail_plays.load(Ordering::SeqCst) {
            return Err(AgentError::Playback("decode failed".to_string()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
