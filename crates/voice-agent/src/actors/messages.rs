//! Message types for the agent actor.
//!
//! External callers talk to the actor through `AgentMessage` on a bounded
//! `mpsc` mailbox; request-reply uses `oneshot`. Results of work the actor
//! spawned come back as `InternalEvent` on a separate channel.

use crate::errors::AgentError;
use crate::state::{AgentStatus, ConnectOutcome, PlaybackOutcome, StartTrigger, TimerKind};
use crate::transport::{ConnectionHandle, ConnectionId, PlayerStatus, TransportStatus};
use tokio::sync::oneshot;

/// Messages sent to `AgentActor`.
#[derive(Debug)]
pub enum AgentMessage {
    /// Join the voice channel (explicit command).
    Connect {
        respond_to: oneshot::Sender<Result<ConnectOutcome, AgentError>>,
    },

    /// Leave the voice channel. Replies whether anything was torn down.
    Disconnect { respond_to: oneshot::Sender<bool> },

    /// Start playback unless already playing.
    EnsurePlaying {
        respond_to: oneshot::Sender<Result<PlaybackOutcome, AgentError>>,
    },

    /// Stop playback, keeping the connection.
    StopPlayback { respond_to: oneshot::Sender<()> },

    /// Transport status event.
    TransportStatus {
        connection_id: ConnectionId,
        status: TransportStatus,
    },

    /// Player status event.
    PlayerStatus { status: PlayerStatus },

    /// Non-automated member count of the target channel changed.
    OccupancyChanged { count: usize },

    /// Get the current agent status.
    GetStatus {
        respond_to: oneshot::Sender<AgentStatus>,
    },

    /// Disconnect, then stop the actor.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Results of spawned work, fed back into the actor loop.
#[derive(Debug)]
pub(crate) enum InternalEvent {
    JoinFinished {
        attempt: u64,
        result: Result<ConnectionHandle, AgentError>,
    },
    PlaybackFinished {
        attempt: u64,
        trigger: StartTrigger,
        result: Result<(), AgentError>,
    },
    TimerFired {
        timer: TimerKind,
        generation: u64,
    },
}
