//! Connection manager state machine.
//!
//! Owns the one possible `ConnectionHandle`. Joins are two-phase: a request
//! moves the machine to `Joining` and hands out an attempt number, and the
//! outcome is fed back with that number. A result for anything but the
//! current attempt is stale.
//!
//! ```text
//! Idle ──request──▶ Joining ──ok──▶ Connected ◀──ready── Connecting
//!   ▲                  │                │                    ▲
//!   └──────failed──────┘          disconnected           connecting
//!   ▲                                   ▼                    │
//!   └───────grace expired / destroyed── Disconnected ────────┘
//! ```

use super::timer::TimerSlot;
use crate::transport::{ConnectionHandle, ConnectionId, TransportStatus};
use serde::Serialize;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No handle, no join in flight.
    Idle,
    /// Join request in flight, no handle yet.
    Joining,
    /// Handle exists, link negotiating or self-healing.
    Connecting,
    /// Handle exists, link usable.
    Connected,
    /// Link dropped unexpectedly; grace window running.
    Disconnected,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Joining => "joining",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }

    /// Numeric value for the connection state gauge.
    #[must_use]
    pub const fn gauge_value(&self) -> f64 {
        match self {
            ConnectionState::Idle => 0.0,
            ConnectionState::Joining => 1.0,
            ConnectionState::Connecting => 2.0,
            ConnectionState::Connected => 3.0,
            ConnectionState::Disconnected => 4.0,
        }
    }
}

/// What happens once a join succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kickoff {
    /// Start playback right away (explicit command).
    Immediate,
    /// Wait for the settle delay first (occupancy-driven).
    AfterSettle,
}

/// Result of asking for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Issue a new join with this attempt number.
    Start { attempt: u64 },
    /// A join is already in flight; wait for its result.
    Pending { attempt: u64 },
    /// A handle already exists.
    AlreadyConnected,
}

/// Result of feeding back a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// Handle stored.
    Accepted { kickoff: Kickoff },
    /// The attempt was cancelled meanwhile; the caller must destroy the handle.
    Stale,
}

/// Effect of a transport status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    /// Not for the current handle.
    Ignored,
    /// State updated; `cancel_grace` is set when a pending grace window ended.
    Updated { cancel_grace: bool },
    /// Unexpected drop; a grace window was armed.
    ArmGrace { generation: u64 },
    /// Transport destroyed the session; the handle is gone.
    Destroyed { cancel_grace: bool },
}

/// Everything `release` took out of the machine.
#[derive(Debug, Default)]
pub struct Release {
    /// The handle to tear down, if one existed.
    pub handle: Option<ConnectionHandle>,
    /// Join attempt cancelled while in flight.
    pub cancelled_attempt: Option<u64>,
    /// Whether a grace window was running.
    pub grace_was_armed: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingJoin {
    attempt: u64,
    kickoff: Kickoff,
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    attempts: u64,
    pending: Option<PendingJoin>,
    grace: TimerSlot,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            handle: None,
            attempts: 0,
            pending: None,
            grace: TimerSlot::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    /// Playback is allowed only while a handle exists.
    #[must_use]
    pub fn can_play(&self) -> bool {
        self.handle.is_some()
    }

    /// Ask for a connection. Never creates a second handle.
    ///
    /// An immediate kickoff joining a pending occupancy-driven attempt upgrades
    /// it, so an explicit command never waits for the settle delay.
    pub fn request_connect(&mut self, kickoff: Kickoff) -> ConnectDecision {
        match self.state {
            ConnectionState::Idle => {
                self.attempts = self.attempts.wrapping_add(1);
                self.pending = Some(PendingJoin {
                    attempt: self.attempts,
                    kickoff,
                });
                self.state = ConnectionState::Joining;
                ConnectDecision::Start {
                    attempt: self.attempts,
                }
            }
            ConnectionState::Joining => match self.pending.as_mut() {
                Some(pending) => {
                    if kickoff == Kickoff::Immediate {
                        pending.kickoff = Kickoff::Immediate;
                    }
                    ConnectDecision::Pending {
                        attempt: pending.attempt,
                    }
                }
                // Joining always carries a pending attempt; recover to a fresh join.
                None => {
                    self.state = ConnectionState::Idle;
                    self.request_connect(kickoff)
                }
            },
            ConnectionState::Connecting
            | ConnectionState::Connected
            | ConnectionState::Disconnected => ConnectDecision::AlreadyConnected,
        }
    }

    /// Feed back a successful join.
    pub fn join_succeeded(&mut self, attempt: u64, handle: ConnectionHandle) -> JoinResult {
        match self.pending {
            Some(pending) if pending.attempt == attempt && self.handle.is_none() => {
                self.pending = None;
                self.handle = Some(handle);
                self.state = ConnectionState::Connected;
                JoinResult::Accepted {
                    kickoff: pending.kickoff,
                }
            }
            _ => JoinResult::Stale,
        }
    }

    /// Feed back a failed join. Returns the attempt's kickoff when it was the
    /// current attempt, `None` for a stale one.
    pub fn join_failed(&mut self, attempt: u64) -> Option<Kickoff> {
        match self.pending {
            Some(pending) if pending.attempt == attempt => {
                self.pending = None;
                self.state = ConnectionState::Idle;
                Some(pending.kickoff)
            }
            _ => None,
        }
    }

    /// Take everything out in one step and return to `Idle`.
    ///
    /// Calling it again before a new connect yields an empty `Release`.
    pub fn release(&mut self) -> Release {
        let release = Release {
            handle: self.handle.take(),
            cancelled_attempt: self.pending.take().map(|p| p.attempt),
            grace_was_armed: self.grace.cancel(),
        };
        self.state = ConnectionState::Idle;
        release
    }

    /// React to a transport status event.
    pub fn on_status(&mut self, id: &ConnectionId, status: TransportStatus) -> StatusEffect {
        if self.handle.as_ref().map(|h| &h.id) != Some(id) {
            return StatusEffect::Ignored;
        }

        match status {
            TransportStatus::Connecting => {
                let cancel_grace = self.grace.cancel();
                self.state = ConnectionState::Connecting;
                StatusEffect::Updated { cancel_grace }
            }
            TransportStatus::Ready => {
                let cancel_grace = self.grace.cancel();
                self.state = ConnectionState::Connected;
                StatusEffect::Updated { cancel_grace }
            }
            TransportStatus::Disconnected => {
                if self.state == ConnectionState::Disconnected {
                    // Same drop reported twice; keep the window already running.
                    return StatusEffect::Updated {
                        cancel_grace: false,
                    };
                }
                self.state = ConnectionState::Disconnected;
                StatusEffect::ArmGrace {
                    generation: self.grace.arm(),
                }
            }
            TransportStatus::Destroyed => {
                self.handle = None;
                self.state = ConnectionState::Idle;
                StatusEffect::Destroyed {
                    cancel_grace: self.grace.cancel(),
                }
            }
        }
    }

    /// The grace window elapsed. Returns the handle to force-destroy, if the
    /// link is still down.
    pub fn grace_expired(&mut self, generation: u64) -> Option<ConnectionHandle> {
        if !self.grace.fire(generation) || self.state != ConnectionState::Disconnected {
            return None;
        }
        self.state = ConnectionState::Idle;
        self.handle.take()
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

    fn connected(id: &str) -> ConnectionManager {
        let mut manager = ConnectionManager::new();
        let ConnectDecision::Start { attempt } = manager.request_connect(Kickoff::Immediate) else {
            panic!("expected a fresh join");
        };
        manager.join_succeeded(attempt, handle(id));
        manager
    }

    #[test]
    fn test_connect_from_idle_starts_join() {
        let mut manager = ConnectionManager::new();

        let decision = manager.request_connect(Kickoff::AfterSettle);

        assert_eq!(decision, ConnectDecision::Start { attempt: 1 });
        assert_eq!(manager.state(), ConnectionState::Joining);
        assert!(!manager.can_play());
    }

    #[test]
    fn test_connect_while_joining_shares_attempt() {
        let mut manager = ConnectionManager::new();
        manager.request_connect(Kickoff::AfterSettle);

        let decision = manager.request_connect(Kickoff::AfterSettle);

        assert_eq!(decision, ConnectDecision::Pending { attempt: 1 });
    }

    #[test]
    fn test_immediate_kickoff_upgrades_pending_join() {
        let mut manager = ConnectionManager::new();
        manager.request_connect(Kickoff::AfterSettle);
        manager.request_connect(Kickoff::Immediate);

        let result = manager.join_succeeded(1, handle("c1"));

        assert_eq!(
            result,
            JoinResult::Accepted {
                kickoff: Kickoff::Immediate
            }
        );
    }

    #[test]
    fn test_connect_while_connected_is_rejected() {
        let mut manager = connected("c1");

        assert_eq!(
            manager.request_connect(Kickoff::Immediate),
            ConnectDecision::AlreadyConnected
        );
        assert_eq!(manager.handle().unwrap().id.0, "c1");
    }

    #[test]
    fn test_join_failed_returns_to_idle() {
        let mut manager = ConnectionManager::new();
        manager.request_connect(Kickoff::Immediate);

        assert_eq!(manager.join_failed(1), Some(Kickoff::Immediate));
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert_eq!(manager.join_failed(1), None);

        assert_eq!(
            manager.request_connect(Kickoff::Immediate),
            ConnectDecision::Start { attempt: 2 }
        );
    }

    #[test]
    fn test_join_after_release_is_stale() {
        let mut manager = ConnectionManager::new();
        manager.request_connect(Kickoff::Immediate);

        let release = manager.release();
        assert_eq!(release.cancelled_attempt, Some(1));
        assert!(release.handle.is_none());

        assert_eq!(manager.join_succeeded(1, handle("late")), JoinResult::Stale);
        assert!(manager.handle().is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_release_twice_is_empty_second_time() {
        let mut manager = connected("c1");

        let first = manager.release();
        assert_eq!(first.handle.unwrap().id.0, "c1");

        let second = manager.release();
        assert!(second.handle.is_none());
        assert!(second.cancelled_attempt.is_none());
        assert!(!second.grace_was_armed);
    }

    #[test]
    fn test_status_for_other_connection_is_ignored() {
        let mut manager = connected("c1");

        let effect = manager.on_status(
            &ConnectionId("old".to_string()),
            TransportStatus::Disconnected,
        );

        assert_eq!(effect, StatusEffect::Ignored);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_disconnect_then_connecting_cancels_grace() {
        let mut manager = connected("c1");
        let id = ConnectionId("c1".to_string());

        let StatusEffect::ArmGrace { generation } =
            manager.on_status(&id, TransportStatus::Disconnected)
        else {
            panic!("expected grace window");
        };
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        assert_eq!(
            manager.on_status(&id, TransportStatus::Connecting),
            StatusEffect::Updated { cancel_grace: true }
        );
        assert!(manager.grace_expired(generation).is_none());
        assert!(manager.can_play());
    }

    #[test]
    fn test_repeated_disconnected_keeps_single_window() {
        let mut manager = connected("c1");
        let id = ConnectionId("c1".to_string());

        let StatusEffect::ArmGrace { generation } =
            manager.on_status(&id, TransportStatus::Disconnected)
        else {
            panic!("expected grace window");
        };
        assert_eq!(
            manager.on_status(&id, TransportStatus::Disconnected),
            StatusEffect::Updated {
                cancel_grace: false
            }
        );

        assert_eq!(manager.grace_expired(generation).unwrap().id.0, "c1");
    }

    #[test]
    fn test_grace_expiry_takes_handle() {
        let mut manager = connected("c1");
        let id = ConnectionId("c1".to_string());
        let StatusEffect::ArmGrace { generation } =
            manager.on_status(&id, TransportStatus::Disconnected)
        else {
            panic!("expected grace window");
        };

        let expired = manager.grace_expired(generation);

        assert_eq!(expired.unwrap().id.0, "c1");
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(manager.grace_expired(generation).is_none());
    }

    #[test]
    fn test_destroyed_clears_handle() {
        let mut manager = connected("c1");
        let id = ConnectionId("c1".to_string());
        manager.on_status(&id, TransportStatus::Disconnected);

        let effect = manager.on_status(&id, TransportStatus::Destroyed);

        assert_eq!(effect, StatusEffect::Destroyed { cancel_grace: true });
        assert!(manager.handle().is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }
}
