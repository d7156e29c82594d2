//! Voice agent configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use crate::state::Timings;
use common::secret::SecretString;
use common::types::{ChannelId, GuildId, VoiceEndpoint};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default looped audio asset.
pub const DEFAULT_AUDIO_FILE: &str = "around_the_world.mp3";

/// Default bind address for ingress, health and metrics.
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default reconnect grace window after an unexpected disconnect.
pub const DEFAULT_RECONNECT_GRACE_MS: u64 = 5_000;

/// Default delay before retrying playback after a player error.
pub const DEFAULT_ERROR_RETRY_MS: u64 = 5_000;

/// Default settle delay between an occupancy-driven join and playback.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_500;

/// Upper bound for the reconnect grace window.
pub const MAX_RECONNECT_GRACE_MS: u64 = 60_000;

/// Upper bound for the playback error retry delay.
pub const MAX_ERROR_RETRY_MS: u64 = 300_000;

/// Upper bound for the settle delay.
pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;

/// Voice agent configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the voice gateway sidecar.
    pub gateway_url: String,

    /// Bearer token for outbound gateway calls.
    pub gateway_token: SecretString,

    /// Bearer token expected on ingress requests.
    pub ingress_token: SecretString,

    /// Target guild and voice channel.
    pub endpoint: VoiceEndpoint,

    /// Looped audio asset (default: "around_the_world.mp3").
    pub audio_file: PathBuf,

    /// HTTP bind address for ingress, health and metrics (default: "0.0.0.0:8090").
    pub http_bind_address: String,

    /// Reconnect grace window in milliseconds (default: 5000).
    pub reconnect_grace_ms: u64,

    /// Playback error retry delay in milliseconds (default: 5000).
    pub error_retry_ms: u64,

    /// Settle delay in milliseconds (default: 1500).
    pub settle_delay_ms: u64,

    /// Join and leave automatically on occupancy edges (default: true).
    pub auto_join: bool,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gateway_url", &self.gateway_url)
            .field("gateway_token", &"[REDACTED]")
            .field("ingress_token", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("audio_file", &self.audio_file)
            .field("http_bind_address", &self.http_bind_address)
            .field("reconnect_grace_ms", &self.reconnect_grace_ms)
            .field("error_retry_ms", &self.error_retry_ms)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("auto_join", &self.auto_join)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Audio asset not found: {0}")]
    MissingAudioAsset(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let gateway_url = required(vars, "VOICE_GATEWAY_URL")?
            .trim_end_matches('/')
            .to_string();
        if !(gateway_url.starts_with("http://") || gateway_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(format!(
                "VOICE_GATEWAY_URL must be an http(s) URL, got '{gateway_url}'"
            )));
        }

        let gateway_token = SecretString::from(required(vars, "VOICE_GATEWAY_TOKEN")?.clone());
        let ingress_token = SecretString::from(required(vars, "AGENT_INGRESS_TOKEN")?.clone());

        let guild_id: GuildId = parse_required(vars, "GUILD_ID")?;
        let channel_id: ChannelId = parse_required(vars, "VOICE_CHANNEL_ID")?;

        let audio_file = vars
            .get("AUDIO_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_AUDIO_FILE), PathBuf::from);

        let http_bind_address = vars
            .get("AGENT_HTTP_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BIND_ADDRESS.to_string());

        // Grace and retry must be non-zero; the settle delay may be skipped.
        let reconnect_grace_ms = parse_bounded_ms(
            vars,
            "AGENT_RECONNECT_GRACE_MS",
            DEFAULT_RECONNECT_GRACE_MS,
            1..=MAX_RECONNECT_GRACE_MS,
        )?;
        let error_retry_ms = parse_bounded_ms(
            vars,
            "AGENT_ERROR_RETRY_MS",
            DEFAULT_ERROR_RETRY_MS,
            1..=MAX_ERROR_RETRY_MS,
        )?;
        let settle_delay_ms = parse_bounded_ms(
            vars,
            "AGENT_SETTLE_DELAY_MS",
            DEFAULT_SETTLE_DELAY_MS,
            0..=MAX_SETTLE_DELAY_MS,
        )?;

        let auto_join = match vars.get("AGENT_AUTO_JOIN").map(|s| s.trim().to_ascii_lowercase()) {
            None => true,
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            Some(v) => {
                return Err(ConfigError::InvalidValue(format!(
                    "AGENT_AUTO_JOIN must be a boolean, got '{v}'"
                )))
            }
        };

        Ok(Config {
            gateway_url,
            gateway_token,
            ingress_token,
            endpoint: VoiceEndpoint::new(guild_id, channel_id),
            audio_file,
            http_bind_address,
            reconnect_grace_ms,
            error_retry_ms,
            settle_delay_ms,
            auto_join,
        })
    }

    /// Timer durations for the core state machines.
    #[must_use]
    pub fn timings(&self) -> Timings {
        Timings {
            reconnect_grace: Duration::from_millis(self.reconnect_grace_ms),
            error_retry: Duration::from_millis(self.error_retry_ms),
            settle: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Result<&'a String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_required<T: FromStr>(vars: &HashMap<String, String>, name: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    let raw = required(vars, name)?;
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{name}='{raw}': {e}")))
}

fn parse_bounded_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    allowed: RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{name}='{raw}': {e}")))?;

    if !allowed.contains(&value) {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be between {} and {} ms, got {value}",
            allowed.start(),
            allowed.end()
        )));
    }

    Ok(value)
}
