//! Identifier types for the chat platform.
//!
//! Platform identifiers are 64-bit snowflakes. They are wrapped in newtypes
//! so a guild can never be passed where a channel is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw snowflake value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

snowflake!(
    /// Unique identifier for a guild (server).
    GuildId
);

snowflake!(
    /// Unique identifier for a channel.
    ChannelId
);

snowflake!(
    /// Unique identifier for a user.
    UserId
);

/// The voice channel the agent serves.
///
/// Supplied once at startup and never changes for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceEndpoint {
    /// Guild that owns the channel.
    pub guild_id: GuildId,
    /// Target voice channel.
    pub channel_id: ChannelId,
}

impl VoiceEndpoint {
    /// Create a new endpoint reference.
    #[must_use]
    pub const fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl fmt::Display for VoiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}
