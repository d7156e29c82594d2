//! Mailbox monitoring for the agent actor.
//!
//! | Level    | Depth   |
//! |----------|---------|
//! | Normal   | < 32    |
//! | Warning  | 32-128  |
//! | Critical | > 128   |
//!
//! Under normal operation the mailbox stays near empty: every message is
//! handled without blocking except destroy/stop/subscribe calls to the gateway.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Depth below which the mailbox is considered healthy.
pub const AGENT_MAILBOX_NORMAL: usize = 32;

/// Depth above which the mailbox is critical.
pub const AGENT_MAILBOX_WARNING: usize = 128;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    Normal,
    Warning,
    Critical,
}

/// Mailbox monitor for tracking queue depth.
#[derive(Debug, Default)]
pub struct MailboxMonitor {
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message being taken into processing.
    pub fn record_enqueue(&self) {
        let new_depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_depth.fetch_max(new_depth, Ordering::Relaxed);

        match level_for_depth(new_depth) {
            MailboxLevel::Critical => warn!(
                target: "va.actor.mailbox",
                depth = new_depth,
                threshold = AGENT_MAILBOX_WARNING,
                "Mailbox depth critical"
            ),
            MailboxLevel::Warning if new_depth == AGENT_MAILBOX_NORMAL + 1 => debug!(
                target: "va.actor.mailbox",
                depth = new_depth,
                "Mailbox depth elevated"
            ),
            _ => {}
        }
    }

    /// Record a message as processed.
    pub fn record_dequeue(&self) {
        self.depth.fetch_sub(1, Ordering::Relaxed);
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        level_for_depth(self.current_depth())
    }
}

fn level_for_depth(depth: usize) -> MailboxLevel {
    if depth > AGENT_MAILBOX_WARNING {
        MailboxLevel::Critical
    } else if depth > AGENT_MAILBOX_NORMAL {
        MailboxLevel::Warning
    } else {
        MailboxLevel::Normal
    }
}
