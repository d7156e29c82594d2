//! Playback controller state machine.
//!
//! Owns the looping policy for the single player: idle restarts, the flat
//! error retry and the settle delay after an occupancy-driven join. Like the
//! connection manager, every start gets an attempt number and its outcome is
//! fed back with it.

use super::timer::TimerSlot;
use serde::Serialize;

/// Playback lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Not playing and not trying to.
    Stopped,
    /// A start is in flight.
    Starting,
    /// Resource playing.
    Playing,
    /// Resource finished; a restart follows.
    Idle,
    /// Player fault; a retry is scheduled.
    Errored,
}

impl PlaybackState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Starting => "starting",
            PlaybackState::Playing => "playing",
            PlaybackState::Idle => "idle",
            PlaybackState::Errored => "errored",
        }
    }
}

/// Why a start was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
    /// Explicit command.
    Command,
    /// Join succeeded with an immediate kickoff.
    Connected,
    /// Settle delay elapsed.
    Settled,
    /// Previous resource finished.
    Idle,
    /// Error retry delay elapsed.
    ErrorRetry,
}

impl StartTrigger {
    /// Returns the trigger as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StartTrigger::Command => "command",
            StartTrigger::Connected => "connected",
            StartTrigger::Settled => "settled",
            StartTrigger::Idle => "idle",
            StartTrigger::ErrorRetry => "error_retry",
        }
    }
}

/// Result of asking to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Issue a start with this attempt number.
    Start { attempt: u64 },
    /// Already starting or playing; nothing to do.
    AlreadyPlaying,
    /// No connection to play into.
    NotConnected,
}

/// Result of feeding back a start attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    Playing,
    /// The start failed; a retry was armed.
    Failed { retry_generation: u64 },
    /// Not the current attempt.
    Stale,
}

/// Effect of a player error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReaction {
    /// Generation of the freshly armed retry.
    pub retry_generation: u64,
    /// A start that was in flight and is now abandoned.
    pub interrupted_attempt: Option<u64>,
}

/// Everything `stop` cleared.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StopSummary {
    pub in_flight: Option<u64>,
    pub retry_was_armed: bool,
    pub settle_was_armed: bool,
    /// Whether the controller was doing anything at all.
    pub was_active: bool,
}

#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    attempts: u64,
    in_flight: Option<u64>,
    retry: TimerSlot,
    settle: TimerSlot,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            attempts: 0,
            in_flight: None,
            retry: TimerSlot::default(),
            settle: TimerSlot::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Start unless already starting or playing.
    pub fn start(&mut self, connected: bool) -> StartDecision {
        if !connected {
            return StartDecision::NotConnected;
        }
        if matches!(self.state, PlaybackState::Starting | PlaybackState::Playing) {
            return StartDecision::AlreadyPlaying;
        }

        self.attempts = self.attempts.wrapping_add(1);
        self.in_flight = Some(self.attempts);
        self.state = PlaybackState::Starting;
        StartDecision::Start {
            attempt: self.attempts,
        }
    }

    /// Disarm a pending error retry. Returns whether one was armed.
    pub fn cancel_retry(&mut self) -> bool {
        self.retry.cancel()
    }

    /// Disarm a pending settle delay. Returns whether one was armed.
    pub fn cancel_settle(&mut self) -> bool {
        self.settle.cancel()
    }

    /// Feed back the outcome of a start attempt.
    pub fn start_finished(&mut self, attempt: u64, ok: bool) -> StartResult {
        if self.in_flight != Some(attempt) {
            return StartResult::Stale;
        }
        self.in_flight = None;

        if ok {
            self.state = PlaybackState::Playing;
            StartResult::Playing
        } else {
            self.state = PlaybackState::Errored;
            StartResult::Failed {
                retry_generation: self.retry.arm(),
            }
        }
    }

    /// The resource finished. Returns whether playback should restart.
    ///
    /// Only a resource that was playing loops; an idle after an error waits
    /// for the scheduled retry.
    pub fn on_idle(&mut self) -> bool {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Idle;
            true
        } else {
            false
        }
    }

    /// The player reports playing. Returns whether a pending retry was cancelled.
    pub fn on_playing(&mut self) -> bool {
        if self.state == PlaybackState::Stopped {
            return false;
        }
        self.state = PlaybackState::Playing;
        self.retry.cancel()
    }

    /// The player reports a fault. Each fault gets its own flat retry,
    /// superseding any retry already pending.
    pub fn on_error(&mut self) -> Option<ErrorReaction> {
        if self.state == PlaybackState::Stopped {
            return None;
        }
        self.state = PlaybackState::Errored;
        Some(ErrorReaction {
            retry_generation: self.retry.arm(),
            interrupted_attempt: self.in_flight.take(),
        })
    }

    /// Returns whether the error retry expiry is current.
    pub fn retry_fired(&mut self, generation: u64) -> bool {
        self.retry.fire(generation)
    }

    /// Arm the settle delay. Returns its generation.
    pub fn arm_settle(&mut self) -> u64 {
        self.settle.arm()
    }

    /// Returns whether the settle expiry is current.
    pub fn settle_fired(&mut self, generation: u64) -> bool {
        self.settle.fire(generation)
    }

    /// Reset to `Stopped`, clearing any in-flight start and pending timers.
    pub fn stop(&mut self) -> StopSummary {
        let summary = StopSummary {
            in_flight: self.in_flight.take(),
            retry_was_armed: self.retry.cancel(),
            settle_was_armed: self.settle.cancel(),
            was_active: self.state != PlaybackState::Stopped,
        };
        self.state = PlaybackState::Stopped;
        summary
    }
}
