//! Occupancy edge detection.
//!
//! Occupancy is derived from each membership snapshot, never stored. The
//! tracker keeps only the previous count so it can report the two edges the
//! auto-join policy acts on.

use common::types::UserId;
use serde::Deserialize;
use std::collections::HashSet;

/// One member of the target voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    /// Automated accounts never count towards occupancy.
    #[serde(default)]
    pub bot: bool,
}

/// Count distinct non-automated members.
#[must_use]
pub fn human_count(members: &[Member]) -> usize {
    members
        .iter()
        .filter(|m| !m.bot)
        .map(|m| m.user_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Edge crossed by an occupancy update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyEdge {
    /// 0 to at least one.
    Arrived,
    /// At least one to 0.
    Emptied,
}

#[derive(Debug, Default)]
pub struct OccupancyTracker {
    last: usize,
}

impl OccupancyTracker {
    #[must_use]
    pub fn count(&self) -> usize {
        self.last
    }

    /// Record a new count and report the edge it crossed, if any.
    pub fn observe(&mut self, count: usize) -> Option<OccupancyEdge> {
        let previous = std::mem::replace(&mut self.last, count);
        match (previous, count) {
            (0, n) if n > 0 => Some(OccupancyEdge::Arrived),
            (p, 0) if p > 0 => Some(OccupancyEdge::Emptied),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn member(id: u64, bot: bool) -> Member {
        Member {
            user_id: UserId(id),
            bot,
        }
    }

    #[test]
    fn test_human_count_skips_bots_and_duplicates() {
        let members = [
            member(1, false),
            member(2, true),
            member(1, false),
            member(3, false),
        ];

        assert_eq!(human_count(&members), 2);
        assert_eq!(human_count(&[]), 0);
    }

    #[test]
    fn test_edges() {
        let mut tracker = OccupancyTracker::default();

        assert_eq!(tracker.observe(0), None);
        assert_eq!(tracker.observe(1), Some(OccupancyEdge::Arrived));
        assert_eq!(tracker.observe(3), None);
        assert_eq!(tracker.observe(1), None);
        assert_eq!(tracker.observe(0), Some(OccupancyEdge::Emptied));
        assert_eq!(tracker.observe(0), None);
        assert_eq!(tracker.observe(2), Some(OccupancyEdge::Arrived));
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn test_member_bot_defaults_to_false() {
        let member: Member = serde_json::from_str(r#"{"user_id": 42}"#).unwrap();
        assert_eq!(member, Member { user_id: UserId(42), bot: false });
    }
}
