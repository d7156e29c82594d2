//! Side-effect-free core of the agent.
//!
//! `AgentCore` couples the connection manager, the playback controller and the
//! occupancy tracker. Every input runs synchronously and returns the commands
//! the runtime must execute, in order. The core never sleeps, never does I/O
//! and never sees a clock; timers are commands carrying a generation, and
//! their expiries come back as inputs.

pub mod connection;
pub mod occupancy;
pub mod playback;
pub mod timer;

pub use connection::{ConnectDecision, ConnectionManager, ConnectionState, Kickoff};
pub use occupancy::{human_count, Member, OccupancyEdge, OccupancyTracker};
pub use playback::{PlaybackController, PlaybackState, StartDecision, StartTrigger};
pub use timer::{TimerKind, TimerSlot};

use crate::errors::AgentError;
use crate::transport::{ConnectionHandle, ConnectionId, PlayerStatus, TransportStatus};
use connection::{JoinResult, StatusEffect};
use playback::StartResult;
use serde::Serialize;
use std::time::Duration;

/// Durations of the three timed waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub reconnect_grace: Duration,
    pub error_retry: Duration,
    pub settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_millis(5_000),
            error_retry: Duration::from_millis(5_000),
            settle: Duration::from_millis(1_500),
        }
    }
}

/// Successful connect outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    /// A new connection was made.
    Joined,
    /// A connection already existed; nothing was created.
    AlreadyConnected,
}

/// Successful playback outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    Started,
    AlreadyPlaying,
}

/// Why a connection is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Explicit disconnect (command, auto-leave, shutdown).
    Requested,
    /// Reconnect grace window elapsed.
    GraceExpired,
    /// A join completed after it had been cancelled.
    StaleJoin,
    /// The player could not be subscribed to a fresh connection.
    SubscribeFailed,
}

impl TeardownReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TeardownReason::Requested => "requested",
            TeardownReason::GraceExpired => "grace_expired",
            TeardownReason::StaleJoin => "stale_join",
            TeardownReason::SubscribeFailed => "subscribe_failed",
        }
    }
}

/// Work for the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Join the voice channel; report back with this attempt.
    Join { attempt: u64 },
    /// Tear the connection down.
    Destroy {
        handle: ConnectionHandle,
        reason: TeardownReason,
    },
    /// Subscribe the player to the connection; report back with this attempt.
    Subscribe {
        attempt: u64,
        handle: ConnectionHandle,
    },
    /// Create a resource and play it; report back with this attempt.
    StartPlayback { attempt: u64, trigger: StartTrigger },
    /// Stop the player.
    StopPlayback,
    /// Schedule an expiry for `timer`, replacing any earlier one.
    ArmTimer {
        timer: TimerKind,
        generation: u64,
        after: Duration,
    },
    /// Drop the scheduled expiry for `timer`.
    CancelTimer(TimerKind),
    /// Answer everyone waiting on this connect attempt.
    ConnectResolved {
        attempt: u64,
        result: Result<ConnectOutcome, AgentError>,
    },
    /// Answer everyone waiting on this playback attempt.
    PlaybackResolved {
        attempt: u64,
        result: Result<PlaybackOutcome, AgentError>,
    },
}

/// Snapshot of the agent for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    pub connection: ConnectionState,
    pub playback: PlaybackState,
    pub occupancy: usize,
    pub connection_id: Option<ConnectionId>,
    pub auto_join: bool,
}

/// A joined connection waiting for the player subscription.
#[derive(Debug, Clone, Copy)]
struct Subscribing {
    attempt: u64,
    kickoff: Kickoff,
}

#[derive(Debug)]
pub struct AgentCore {
    connection: ConnectionManager,
    playback: PlaybackController,
    occupancy: OccupancyTracker,
    timings: Timings,
    auto_join: bool,
    subscribing: Option<Subscribing>,
    /// An occupancy-driven connect failed while members were present; the
    /// next membership snapshot with members tries again.
    occupancy_rejoin: bool,
}

impl AgentCore {
    #[must_use]
    pub fn new(timings: Timings, auto_join: bool) -> Self {
        Self {
            connection: ConnectionManager::new(),
            playback: PlaybackController::new(),
            occupancy: OccupancyTracker::default(),
            timings,
            auto_join,
            subscribing: None,
            occupancy_rejoin: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            connection: self.connection.state(),
            playback: self.playback.state(),
            occupancy: self.occupancy.count(),
            connection_id: self.connection.handle().map(|h| h.id.clone()),
            auto_join: self.auto_join,
        }
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Request a connection.
    pub fn connect(&mut self, kickoff: Kickoff) -> (ConnectDecision, Vec<Command>) {
        self.occupancy_rejoin = false;
        let decision = self.connection.request_connect(kickoff);
        let commands = match decision {
            ConnectDecision::Start { attempt } => vec![Command::Join { attempt }],
            ConnectDecision::Pending { .. } | ConnectDecision::AlreadyConnected => Vec::new(),
        };
        (decision, commands)
    }

    /// A join finished. A fresh handle is only reported as connected once
    /// the player subscription succeeds (`subscribe_finished`).
    pub fn join_finished(
        &mut self,
        attempt: u64,
        result: Result<ConnectionHandle, AgentError>,
    ) -> Vec<Command> {
        match result {
            Ok(handle) => match self.connection.join_succeeded(attempt, handle.clone()) {
                JoinResult::Accepted { kickoff } => {
                    self.subscribing = Some(Subscribing { attempt, kickoff });
                    vec![Command::Subscribe { attempt, handle }]
                }
                JoinResult::Stale => vec![Command::Destroy {
                    handle,
                    reason: TeardownReason::StaleJoin,
                }],
            },
            Err(error) => match self.connection.join_failed(attempt) {
                Some(kickoff) => {
                    self.note_failed_connect(kickoff);
                    vec![Command::ConnectResolved {
                        attempt,
                        result: Err(error),
                    }]
                }
                None => Vec::new(),
            },
        }
    }

    /// The player subscription for a fresh handle finished.
    ///
    /// On failure the handle is destroyed and the connect fails, so the agent
    /// never reports a connection that cannot carry audio.
    pub fn subscribe_finished(&mut self, attempt: u64, result: Result<(), AgentError>) -> Vec<Command> {
        let kickoff = match self.subscribing {
            Some(subscribing) if subscribing.attempt == attempt => {
                self.subscribing = None;
                subscribing.kickoff
            }
            _ => return Vec::new(),
        };

        match result {
            Ok(()) => {
                let mut commands = vec![Command::ConnectResolved {
                    attempt,
                    result: Ok(ConnectOutcome::Joined),
                }];
                match kickoff {
                    Kickoff::Immediate => {
                        commands.extend(self.ensure_playing(StartTrigger::Connected).1);
                    }
                    Kickoff::AfterSettle => commands.push(Command::ArmTimer {
                        timer: TimerKind::Settle,
                        generation: self.playback.arm_settle(),
                        after: self.timings.settle,
                    }),
                }
                commands
            }
            Err(error) => {
                self.note_failed_connect(kickoff);
                let release = self.connection.release();
                let mut commands = Vec::new();
                if release.grace_was_armed {
                    commands.push(Command::CancelTimer(TimerKind::ReconnectGrace));
                }
                if let Some(handle) = release.handle {
                    commands.push(Command::Destroy {
                        handle,
                        reason: TeardownReason::SubscribeFailed,
                    });
                }
                commands.push(Command::ConnectResolved {
                    attempt,
                    result: Err(error),
                });
                commands
            }
        }
    }

    fn note_failed_connect(&mut self, kickoff: Kickoff) {
        if kickoff == Kickoff::AfterSettle {
            self.occupancy_rejoin = true;
        }
    }

    /// Tear down whatever exists. Returns whether anything was torn down;
    /// a second call in a row returns `false` and no commands.
    pub fn disconnect(&mut self) -> (bool, Vec<Command>) {
        self.occupancy_rejoin = false;
        let release = self.connection.release();
        let mut commands = Vec::new();

        if let Some(subscribing) = self.subscribing.take() {
            commands.push(Command::ConnectResolved {
                attempt: subscribing.attempt,
                result: Err(AgentError::Superseded),
            });
        }

        if let Some(attempt) = release.cancelled_attempt {
            commands.push(Command::ConnectResolved {
                attempt,
                result: Err(AgentError::Superseded),
            });
        }
        if release.grace_was_armed {
            commands.push(Command::CancelTimer(TimerKind::ReconnectGrace));
        }

        let had_handle = release.handle.is_some();
        if let Some(handle) = release.handle {
            commands.push(Command::Destroy {
                handle,
                reason: TeardownReason::Requested,
            });
        }
        commands.extend(self.stop_playback());

        (had_handle || release.cancelled_attempt.is_some(), commands)
    }

    /// Start playback unless it is already starting or playing.
    pub fn ensure_playing(&mut self, trigger: StartTrigger) -> (StartDecision, Vec<Command>) {
        let decision = self.playback.start(self.connection.can_play());
        let mut commands = Vec::new();

        if let StartDecision::Start { attempt } = decision {
            if self.playback.cancel_retry() {
                commands.push(Command::CancelTimer(TimerKind::ErrorRetry));
            }
            if self.playback.cancel_settle() {
                commands.push(Command::CancelTimer(TimerKind::Settle));
            }
            commands.push(Command::StartPlayback { attempt, trigger });
        }

        (decision, commands)
    }

    /// Stop playback and clear its pending timers.
    pub fn stop_playback(&mut self) -> Vec<Command> {
        let summary = self.playback.stop();
        let mut commands = Vec::new();

        if let Some(attempt) = summary.in_flight {
            commands.push(Command::PlaybackResolved {
                attempt,
                result: Err(AgentError::Superseded),
            });
        }
        if summary.retry_was_armed {
            commands.push(Command::CancelTimer(TimerKind::ErrorRetry));
        }
        if summary.settle_was_armed {
            commands.push(Command::CancelTimer(TimerKind::Settle));
        }
        if summary.was_active {
            commands.push(Command::StopPlayback);
        }

        commands
    }

    /// A playback start finished.
    pub fn playback_finished(&mut self, attempt: u64, result: Result<(), AgentError>) -> Vec<Command> {
        let mut commands = Vec::new();

        if let StartResult::Failed { retry_generation } =
            self.playback.start_finished(attempt, result.is_ok())
        {
            commands.push(Command::ArmTimer {
                timer: TimerKind::ErrorRetry,
                generation: retry_generation,
                after: self.timings.error_retry,
            });
        }

        commands.push(Command::PlaybackResolved {
            attempt,
            result: result.map(|()| PlaybackOutcome::Started),
        });
        commands
    }

    /// A transport status event arrived.
    pub fn transport_status(&mut self, id: &ConnectionId, status: TransportStatus) -> Vec<Command> {
        match self.connection.on_status(id, status) {
            StatusEffect::Ignored
            | StatusEffect::Updated {
                cancel_grace: false,
            } => Vec::new(),
            StatusEffect::Updated { cancel_grace: true } => {
                vec![Command::CancelTimer(TimerKind::ReconnectGrace)]
            }
            StatusEffect::ArmGrace { generation } => vec![Command::ArmTimer {
                timer: TimerKind::ReconnectGrace,
                generation,
                after: self.timings.reconnect_grace,
            }],
            StatusEffect::Destroyed { cancel_grace } => {
                let mut commands = Vec::new();
                if cancel_grace {
                    commands.push(Command::CancelTimer(TimerKind::ReconnectGrace));
                }
                commands.extend(self.stop_playback());
                commands
            }
        }
    }

    /// A player status event arrived.
    pub fn player_status(&mut self, status: &PlayerStatus) -> Vec<Command> {
        match status {
            PlayerStatus::Idle => {
                if self.playback.on_idle() {
                    self.ensure_playing(StartTrigger::Idle).1
                } else {
                    Vec::new()
                }
            }
            PlayerStatus::Playing => {
                if self.playback.on_playing() {
                    vec![Command::CancelTimer(TimerKind::ErrorRetry)]
                } else {
                    Vec::new()
                }
            }
            PlayerStatus::Error(reason) => {
                let Some(reaction) = self.playback.on_error() else {
                    return Vec::new();
                };
                let mut commands = Vec::new();
                if let Some(attempt) = reaction.interrupted_attempt {
                    commands.push(Command::PlaybackResolved {
                        attempt,
                        result: Err(AgentError::Playback(reason.clone())),
                    });
                }
                commands.push(Command::ArmTimer {
                    timer: TimerKind::ErrorRetry,
                    generation: reaction.retry_generation,
                    after: self.timings.error_retry,
                });
                commands
            }
        }
    }

    /// The occupancy count changed.
    ///
    /// Besides the two edges, a snapshot with members present retries an
    /// occupancy-driven connect that failed earlier.
    pub fn occupancy_changed(&mut self, count: usize) -> Vec<Command> {
        let edge = self.occupancy.observe(count);
        if !self.auto_join {
            return Vec::new();
        }
        match edge {
            Some(OccupancyEdge::Arrived) => self.connect(Kickoff::AfterSettle).1,
            Some(OccupancyEdge::Emptied) => self.disconnect().1,
            None if self.occupancy_rejoin && count > 0 => self.connect(Kickoff::AfterSettle).1,
            None => Vec::new(),
        }
    }

    /// A scheduled timer expired.
    pub fn timer_fired(&mut self, timer: TimerKind, generation: u64) -> Vec<Command> {
        match timer {
            TimerKind::ReconnectGrace => match self.connection.grace_expired(generation) {
                Some(handle) => {
                    let mut commands = vec![Command::Destroy {
                        handle,
                        reason: TeardownReason::GraceExpired,
                    }];
                    commands.extend(self.stop_playback());
                    commands
                }
                None => Vec::new(),
            },
            TimerKind::ErrorRetry => {
                if self.playback.retry_fired(generation) {
                    self.ensure_playing(StartTrigger::ErrorRetry).1
                } else {
                    Vec::new()
                }
            }
            TimerKind::Settle => {
                if self.playback.settle_fired(generation) {
                    self.ensure_playing(StartTrigger::Settled).1
                } else {
                    Vec::new()
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use common::types::{ChannelId, GuildId, VoiceEndpoint};

    fn handle(id: &str) -> ConnectionHandle {
        ConnectionHandle {
            id: ConnectionId(id.to_string()),
            endpoint: VoiceEndpoint::new(GuildId(1), ChannelId(2)),
        }
    }

    fn core() -> AgentCore {
        AgentCore::new(Timings::default(), true)
    }

    /// Feed back a successful join and subscription for `attempt`.
    fn joined(core: &mut AgentCore, attempt: u64, id: &str) -> Vec<Command> {
        let commands = core.join_finished(attempt, Ok(handle(id)));
        assert_eq!(
            commands,
            vec![Command::Subscribe {
                attempt,
                handle: handle(id)
            }]
        );
        core.subscribe_finished(attempt, Ok(()))
    }

    /// Core with a live connection and playback running.
    fn playing_core() -> AgentCore {
        let mut core = core();
        core.connect(Kickoff::Immediate);
        joined(&mut core, 1, "c1");
        core.playback_finished(1, Ok(()));
        assert_eq!(core.playback_state(), PlaybackState::Playing);
        core
    }

    fn count_starts(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, Command::StartPlayback { .. }))
            .count()
    }

    fn armed(commands: &[Command], kind: TimerKind) -> Option<(u64, Duration)> {
        commands.iter().find_map(|c| match c {
            Command::ArmTimer {
                timer,
                generation,
                after,
            } if *timer == kind => Some((*generation, *after)),
            _ => None,
        })
    }

    #[test]
    fn test_command_connect_joins_then_plays() {
        let mut core = core();

        let (decision, commands) = core.connect(Kickoff::Immediate);
        assert_eq!(decision, ConnectDecision::Start { attempt: 1 });
        assert_eq!(commands, vec![Command::Join { attempt: 1 }]);

        let commands = core.join_finished(1, Ok(handle("c1")));
        assert_eq!(
            commands,
            vec![Command::Subscribe {
                attempt: 1,
                handle: handle("c1")
            }]
        );

        let commands = core.subscribe_finished(1, Ok(()));
        assert_eq!(
            commands,
            vec![
                Command::ConnectResolved {
                    attempt: 1,
                    result: Ok(ConnectOutcome::Joined)
                },
                Command::StartPlayback {
                    attempt: 1,
                    trigger: StartTrigger::Connected
                },
            ]
        );
    }

    #[test]
    fn test_double_connect_never_joins_twice() {
        let mut core = core();

        let (_, first) = core.connect(Kickoff::Immediate);
        let (second, commands) = core.connect(Kickoff::Immediate);

        assert_eq!(first.len(), 1);
        assert_eq!(second, ConnectDecision::Pending { attempt: 1 });
        assert!(commands.is_empty());

        joined(&mut core, 1, "c1");
        let (third, commands) = core.connect(Kickoff::Immediate);
        assert_eq!(third, ConnectDecision::AlreadyConnected);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_join_failure_resolves_waiters() {
        let mut core = core();
        core.connect(Kickoff::Immediate);

        let commands = core.join_finished(1, Err(AgentError::Transport("403".to_string())));

        assert_eq!(
            commands,
            vec![Command::ConnectResolved {
                attempt: 1,
                result: Err(AgentError::Transport("403".to_string()))
            }]
        );
        assert_eq!(core.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_disconnect_during_join_destroys_late_handle() {
        let mut core = core();
        core.connect(Kickoff::Immediate);

        let (torn_down, commands) = core.disconnect();
        assert!(torn_down);
        assert_eq!(
            commands,
            vec![Command::ConnectResolved {
                attempt: 1,
                result: Err(AgentError::Superseded)
            }]
        );

        let commands = core.join_finished(1, Ok(handle("late")));
        assert_eq!(
            commands,
            vec![Command::Destroy {
                handle: handle("late"),
                reason: TeardownReason::StaleJoin
            }]
        );
    }

    #[test]
    fn test_disconnect_twice_is_noop_second_time() {
        let mut core = playing_core();

        let (torn_down, commands) = core.disconnect();
        assert!(torn_down);
        assert_eq!(
            commands,
            vec![
                Command::Destroy {
                    handle: handle("c1"),
                    reason: TeardownReason::Requested
                },
                Command::StopPlayback,
            ]
        );

        let (torn_down, commands) = core.disconnect();
        assert!(!torn_down);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_idle_restarts_once() {
        let mut core = playing_core();

        let commands = core.player_status(&PlayerStatus::Idle);
        assert_eq!(
            commands,
            vec![Command::StartPlayback {
                attempt: 2,
                trigger: StartTrigger::Idle
            }]
        );

        assert!(core.player_status(&PlayerStatus::Idle).is_empty());
    }

    #[test]
    fn test_error_schedules_single_retry() {
        let mut core = playing_core();

        let commands = core.player_status(&PlayerStatus::Error("decode".to_string()));
        assert_eq!(count_starts(&commands), 0);
        let (generation, after) = armed(&commands, TimerKind::ErrorRetry).unwrap();
        assert_eq!(after, Duration::from_secs(5));

        let commands = core.timer_fired(TimerKind::ErrorRetry, generation);
        assert_eq!(count_starts(&commands), 1);

        assert!(core.timer_fired(TimerKind::ErrorRetry, generation).is_empty());
    }

    #[test]
    fn test_failed_start_is_retried() {
        let mut core = core();
        core.connect(Kickoff::Immediate);
        joined(&mut core, 1, "c1");

        let commands = core.playback_finished(1, Err(AgentError::Playback("no file".to_string())));

        let (generation, _) = armed(&commands, TimerKind::ErrorRetry).unwrap();
        assert!(commands.contains(&Command::PlaybackResolved {
            attempt: 1,
            result: Err(AgentError::Playback("no file".to_string()))
        }));
        assert_eq!(count_starts(&core.timer_fired(TimerKind::ErrorRetry, generation)), 1);
    }

    #[test]
    fn test_retry_after_disconnect_is_inert() {
        let mut core = playing_core();
        let commands = core.player_status(&PlayerStatus::Error("stream".to_string()));
        let (generation, _) = armed(&commands, TimerKind::ErrorRetry).unwrap();

        let (_, commands) = core.disconnect();
        assert!(commands.contains(&Command::CancelTimer(TimerKind::ErrorRetry)));

        assert!(core.timer_fired(TimerKind::ErrorRetry, generation).is_empty());
    }

    #[test]
    fn test_occupancy_arrival_joins_then_settles() {
        let mut core = core();

        let commands = core.occupancy_changed(1);
        assert_eq!(commands, vec![Command::Join { attempt: 1 }]);

        let commands = joined(&mut core, 1, "c1");
        assert_eq!(count_starts(&commands), 0);
        let (generation, after) = armed(&commands, TimerKind::Settle).unwrap();
        assert_eq!(after, Duration::from_millis(1500));

        let commands = core.timer_fired(TimerKind::Settle, generation);
        assert_eq!(
            commands,
            vec![Command::StartPlayback {
                attempt: 1,
                trigger: StartTrigger::Settled
            }]
        );
    }

    #[test]
    fn test_rapid_occupancy_changes_join_once() {
        let mut core = core();

        let mut joins = 0;
        for count in [1, 2, 1, 3] {
            joins += core
                .occupancy_changed(count)
                .iter()
                .filter(|c| matches!(c, Command::Join { .. }))
                .count();
        }

        assert_eq!(joins, 1);
    }

    #[test]
    fn test_occupancy_emptied_disconnects() {
        let mut core = playing_core();
        core.occupancy_changed(2);

        let commands = core.occupancy_changed(0);

        assert!(commands.contains(&Command::Destroy {
            handle: handle("c1"),
            reason: TeardownReason::Requested
        }));
        assert_eq!(core.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_occupancy_ignored_without_auto_join() {
        let mut core = AgentCore::new(Timings::default(), false);

        assert!(core.occupancy_changed(1).is_empty());
        assert_eq!(core.status().occupancy, 1);
        assert_eq!(core.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_grace_expiry_destroys_once() {
        let mut core = playing_core();
        let id = ConnectionId("c1".to_string());

        let commands = core.transport_status(&id, TransportStatus::Disconnected);
        let (generation, after) = armed(&commands, TimerKind::ReconnectGrace).unwrap();
        assert_eq!(after, Duration::from_secs(5));

        let commands = core.timer_fired(TimerKind::ReconnectGrace, generation);
        assert_eq!(
            commands,
            vec![
                Command::Destroy {
                    handle: handle("c1"),
                    reason: TeardownReason::GraceExpired
                },
                Command::StopPlayback,
            ]
        );
        assert_eq!(core.connection_state(), ConnectionState::Idle);
        assert!(core.timer_fired(TimerKind::ReconnectGrace, generation).is_empty());
    }

    #[test]
    fn test_reconnecting_within_grace_keeps_connection() {
        let mut core = playing_core();
        let id = ConnectionId("c1".to_string());

        let commands = core.transport_status(&id, TransportStatus::Disconnected);
        let (generation, _) = armed(&commands, TimerKind::ReconnectGrace).unwrap();

        let commands = core.transport_status(&id, TransportStatus::Connecting);
        assert_eq!(commands, vec![Command::CancelTimer(TimerKind::ReconnectGrace)]);

        assert!(core.timer_fired(TimerKind::ReconnectGrace, generation).is_empty());
        assert_eq!(core.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_transport_destroyed_stops_without_destroy() {
        let mut core = playing_core();
        let id = ConnectionId("c1".to_string());

        let commands = core.transport_status(&id, TransportStatus::Destroyed);

        assert_eq!(commands, vec![Command::StopPlayback]);
        assert!(core.status().connection_id.is_none());
    }

    #[test]
    fn test_ensure_playing_requires_connection() {
        let mut core = core();

        let (decision, commands) = core.ensure_playing(StartTrigger::Command);

        assert_eq!(decision, StartDecision::NotConnected);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_command_start_cancels_pending_settle() {
        let mut core = core();
        core.occupancy_changed(1);
        let commands = joined(&mut core, 1, "c1");
        let (generation, _) = armed(&commands, TimerKind::Settle).unwrap();

        let (decision, commands) = core.ensure_playing(StartTrigger::Command);
        assert_eq!(decision, StartDecision::Start { attempt: 1 });
        assert_eq!(commands.first(), Some(&Command::CancelTimer(TimerKind::Settle)));

        assert!(core.timer_fired(TimerKind::Settle, generation).is_empty());
    }

    #[test]
    fn test_subscribe_failure_destroys_handle_and_fails_connect() {
        let mut core = core();
        core.connect(Kickoff::Immediate);
        core.join_finished(1, Ok(handle("c1")));

        let commands =
            core.subscribe_finished(1, Err(AgentError::Transport("permission denied".to_string())));

        assert_eq!(
            commands,
            vec![
                Command::Destroy {
                    handle: handle("c1"),
                    reason: TeardownReason::SubscribeFailed
                },
                Command::ConnectResolved {
                    attempt: 1,
                    result: Err(AgentError::Transport("permission denied".to_string()))
                },
            ]
        );
        assert_eq!(count_starts(&commands), 0);
        assert_eq!(core.connection_state(), ConnectionState::Idle);
        assert_eq!(core.playback_state(), PlaybackState::Stopped);
        assert!(core.status().connection_id.is_none());

        let (decision, _) = core.connect(Kickoff::Immediate);
        assert_eq!(decision, ConnectDecision::Start { attempt: 2 });
    }

    #[test]
    fn test_disconnect_while_subscribing_supersedes_connect() {
        let mut core = core();
        core.connect(Kickoff::Immediate);
        core.join_finished(1, Ok(handle("c1")));

        let (torn_down, commands) = core.disconnect();

        assert!(torn_down);
        assert_eq!(
            commands.first(),
            Some(&Command::ConnectResolved {
                attempt: 1,
                result: Err(AgentError::Superseded)
            })
        );
        assert!(core.subscribe_finished(1, Ok(())).is_empty());
    }

    #[test]
    fn test_failed_occupancy_join_retried_on_next_snapshot() {
        let mut core = core();
        core.occupancy_changed(1);
        core.join_finished(1, Err(AgentError::Transport("unavailable".to_string())));
        assert_eq!(core.connection_state(), ConnectionState::Idle);

        let commands = core.occupancy_changed(2);
        assert_eq!(commands, vec![Command::Join { attempt: 2 }]);

        joined(&mut core, 2, "c2");
        assert!(core.occupancy_changed(3).is_empty());
    }

    #[test]
    fn test_failed_occupancy_subscribe_retried_on_next_snapshot() {
        let mut core = core();
        core.occupancy_changed(1);
        core.join_finished(1, Ok(handle("c1")));
        core.subscribe_finished(1, Err(AgentError::Transport("forbidden".to_string())));

        assert_eq!(core.occupancy_changed(1), vec![Command::Join { attempt: 2 }]);
    }

    #[test]
    fn test_failed_command_join_not_retried_by_occupancy() {
        let mut core = core();
        core.occupancy_changed(1);
        core.connect(Kickoff::Immediate);
        core.join_finished(1, Err(AgentError::Transport("unavailable".to_string())));

        assert!(core.occupancy_changed(2).is_empty());
    }

    #[test]
    fn test_quit_after_failed_occupancy_join_stops_retries() {
        let mut core = core();
        core.occupancy_changed(1);
        core.join_finished(1, Err(AgentError::Transport("unavailable".to_string())));

        core.disconnect();

        assert!(core.occupancy_changed(2).is_empty());
    }
}
