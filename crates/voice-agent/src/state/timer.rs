//! Generation-keyed timer slots.
//!
//! A slot never sleeps itself. Arming hands out a generation that the runtime
//! attaches to the scheduled expiry; an expiry only counts if its generation
//! is still current, so cancelling or re-arming makes older expiries inert.

/// The three timed waits of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Grace window after an unexpected transport disconnect.
    ReconnectGrace,
    /// Flat delay before retrying playback after a player fault.
    ErrorRetry,
    /// Pause between an occupancy-driven join and the first playback.
    Settle,
}

impl TimerKind {
    /// Returns the timer kind as a string for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimerKind::ReconnectGrace => "reconnect_grace",
            TimerKind::ErrorRetry => "error_retry",
            TimerKind::Settle => "settle",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TimerSlot {
    generation: u64,
    armed: bool,
}

impl TimerSlot {
    /// Arm the slot, superseding any earlier arming. Returns the new generation.
    pub fn arm(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.armed = true;
        self.generation
    }

    /// Disarm the slot. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.armed;
        self.armed = false;
        self.generation = self.generation.wrapping_add(1);
        was_armed
    }

    /// Consume an expiry. True only for the current generation of an armed slot.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.armed && generation == self.generation {
            self.armed = false;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
