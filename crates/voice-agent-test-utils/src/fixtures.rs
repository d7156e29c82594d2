//! Test fixtures for agent tests.

use crate::{MockPlayer, MockTransport};
use common::types::{ChannelId, GuildId, UserId, VoiceEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use voice_agent::actors::{AgentActor, AgentActorHandle, AgentSettings};
use voice_agent::audio::AudioSource;
use voice_agent::state::{Member, Timings};
use voice_agent::transport::{AudioPlayer, VoiceTransport};

/// Guild used by every fixture.
pub const TEST_GUILD_ID: u64 = 1_000_000_000_000_001;

/// Voice channel used by every fixture.
pub const TEST_CHANNEL_ID: u64 = 1_000_000_000_000_002;

/// The endpoint every test agent serves.
#[must_use]
pub fn test_endpoint() -> VoiceEndpoint {
    VoiceEndpoint::new(GuildId(TEST_GUILD_ID), ChannelId(TEST_CHANNEL_ID))
}

/// Settings with the default timings and auto-join on.
#[must_use]
pub fn test_settings() -> AgentSettings {
    AgentSettings {
        endpoint: test_endpoint(),
        audio: AudioSource::unchecked("/srv/audio/around_the_world.mp3"),
        timings: Timings::default(),
        auto_join: true,
    }
}

/// `n` distinct human members.
#[must_use]
pub fn members(n: u64) -> Vec<Member> {
    (1..=n)
        .map(|id| Member {
            user_id: UserId(id),
            bot: false,
        })
        .collect()
}

/// An automated member.
#[must_use]
pub fn bot(id: u64) -> Member {
    Member {
        user_id: UserId(id),
        bot: true,
    }
}

/// Let spawned work run without moving the paused clock past any timer.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// An agent actor wired to mocks.
pub struct TestAgent {
    pub handle: AgentActorHandle,
    pub task: JoinHandle<()>,
    pub transport: Arc<MockTransport>,
    pub player: Arc<MockPlayer>,
}

impl TestAgent {
    /// Spawn with an accepting transport and a working player.
    #[must_use]
    pub fn spawn(settings: AgentSettings) -> Self {
        Self::spawn_with(settings, MockTransport::accepting(), MockPlayer::new())
    }

    /// Spawn with the given mocks.
    #[must_use]
    pub fn spawn_with(settings: AgentSettings, transport: MockTransport, player: MockPlayer) -> Self {
        let transport = Arc::new(transport);
        let player = Arc::new(player);
        let (handle, task) = AgentActor::spawn(
            settings,
            Arc::clone(&transport) as Arc<dyn VoiceTransport>,
            Arc::clone(&player) as Arc<dyn AudioPlayer>,
            CancellationToken::new(),
        );

        Self {
            handle,
            task,
            transport,
            player,
        }
    }
}
