//! Mock voice transport.
//!
//! Counts every call and hands out connection ids `conn-1`, `conn-2`, ... in
//! join order. Joins can be delayed (to hold an attempt in flight) and made to
//! fail, either from the builder or at runtime. Subscribes can be made to fail
//! the same way.
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_agent_test_utils::MockTransport;
//!
//! let transport = MockTransport::builder()
//!     .join_delay(Duration::from_millis(500))
//!     .build();
//! ```

use async_trait::async_trait;
use common::types::VoiceEndpoint;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use voice_agent::errors::AgentError;
use voice_agent::transport::{ConnectionHandle, ConnectionId, PlayerId, VoiceTransport};

/// Mock transport for agent tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    join_delay: Option<Duration>,
    fail_joins: AtomicBool,
    fail_subscribes: AtomicBool,
    joins: AtomicUsize,
    subscribes: AtomicUsize,
    destroys: AtomicUsize,
    destroyed: Mutex<Vec<ConnectionId>>,
    subscribed_players: Mutex<Vec<PlayerId>>,
}

impl MockTransport {
    /// Create a new `MockTransport` builder.
    #[must_use]
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    /// Create a transport that accepts every join immediately.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Create a transport that rejects every join.
    #[must_use]
    pub fn failing() -> Self {
        Self::builder().failing_joins().build()
    }

    /// Switch join failures on or off.
    pub fn set_join_failure(&self, fail: bool) {
        self.fail_joins.store(fail, Ordering::SeqCst);
    }

    /// Switch subscribe failures on or off.
    pub fn set_subscribe_failure(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::SeqCst);
    }

    /// Number of join calls made.
    #[must_use]
    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    /// Number of subscribe calls made.
    #[must_use]
    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Number of destroy calls made.
    #[must_use]
    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Connection ids passed to destroy, in call order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<ConnectionId> {
        self.destroyed.lock().unwrap().clone()
    }

    /// Player ids passed to subscribe, in call order.
    #[must_use]
    pub fn subscribed_players(&self) -> Vec<PlayerId> {
        self.subscribed_players.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn join_channel(&self, endpoint: &VoiceEndpoint) -> Result<ConnectionHandle, AgentError> {
        let n = self.joins.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.join_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_joins.load(Ordering::SeqCst) {
            return Err(AgentError::Transport("permission denied".to_string()));
        }

        Ok(ConnectionHandle {
            id: ConnectionId(format!("conn-{n}")),
            endpoint: *endpoint,
        })
    }

    async fn subscribe(&self, _handle: &ConnectionHandle, player: &PlayerId) -> Result<(), AgentError> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribes.load(Ordering::SeqCst) {
            return Err(AgentError::Transport("permission denied".to_string()));
        }
        self.subscribed_players.lock().unwrap().push(player.clone());
        Ok(())
    }

    async fn destroy(&self, handle: &ConnectionHandle) -> Result<(), AgentError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.destroyed.lock().unwrap().push(handle.id.clone());
        Ok(())
    }
}

/// Builder for `MockTransport` configuration.
#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    join_delay: Option<Duration>,
    fail_joins: bool,
    fail_subscribes: bool,
}

impl MockTransportBuilder {
    /// Hold every join for `delay` before it resolves.
    #[must_use]
    pub fn join_delay(mut self, delay: Duration) -> Self {
        self.join_delay = Some(delay);
        self
    }

    /// Make every join fail with a transport fault.
    #[must_use]
    pub fn failing_joins(mut self) -> Self {
        self.fail_joins = true;
        self
    }

    /// Make every subscribe fail with a transport fault.
    #[must_use]
    pub fn failing_subscribes(mut self) -> Self {
        self.fail_subscribes = true;
        self
    }

    /// Build the `MockTransport`.
    #[must_use]
    pub fn build(self) -> MockTransport {
        MockTransport {
            join_delay: self.join_delay,
            fail_joins: AtomicBool::new(self.fail_joins),
            fail_subscribes: AtomicBool::new(self.fail_subscribes),
            ..MockTransport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{ChannelId, GuildId};

    fn endpoint() -> VoiceEndpoint {
        VoiceEndpoint::new(GuildId(1), ChannelId(2))
    }

    #[tokio::test]
    async fn test_accepting_hands_out_sequential_ids() {
        let transport = MockTransport::accepting();

        let first = transport.join_channel(&endpoint()).await.unwrap();
        let second = transport.join_channel(&endpoint()).await.unwrap();

        assert_eq!(first.id, ConnectionId("conn-1".to_string()));
        assert_eq!(second.id, ConnectionId("conn-2".to_string()));
        assert_eq!(transport.joins(), 2);
    }

    #[tokio::test]
    async fn test_failing_counts_attempts() {
        let transport = MockTransport::failing();

        assert!(transport.join_channel(&endpoint()).await.is_err());
        assert_eq!(transport.joins(), 1);

        transport.set_join_failure(false);
        assert!(transport.join_channel(&endpoint()).await.is_ok());
    }

    #[tokio::test]
    async fn test_destroy_records_ids() {
        let transport = MockTransport::accepting();
        let handle = transport.join_channel(&endpoint()).await.unwrap();

        transport.destroy(&handle).await.unwrap();

        assert_eq!(transport.destroys(), 1);
        assert_eq!(transport.destroyed(), vec![handle.id]);
    }

    #[tokio::test]
    async fn test_failing_subscribes_records_nothing() {
        let transport = MockTransport::builder().failing_subscribes().build();
        let handle = transport.join_channel(&endpoint()).await.unwrap();
        let player = PlayerId("p".to_string());

        assert!(transport.subscribe(&handle, &player).await.is_err());
        assert_eq!(transport.subscribes(), 1);
        assert!(transport.subscribed_players().is_empty());

        transport.set_subscribe_failure(false);
        assert!(transport.subscribe(&handle, &player).await.is_ok());
    }
}
