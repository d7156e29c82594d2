//! `AgentActor` - runs the agent core against the real collaborators.
//!
//! The actor owns one `AgentCore`, the transport, the player, the audio source
//! and the endpoint. Every input is fed to the core and the returned commands
//! are executed in order:
//!
//! - Joins and playback starts are spawned, so other messages interleave while
//!   the gateway call is in flight. Their results come back on an internal
//!   channel tagged with the attempt number.
//! - Destroy, stop and subscribe are awaited inline. The subscribe result is
//!   fed back to the core before anything else runs, so a connection only
//!   counts as joined once the player is attached.
//! - Timers are spawned sleeps, one per kind. Re-arming or cancelling aborts
//!   the previous sleep; the core also ignores any stale generation.
//!
//! # Shutdown
//!
//! `shutdown()` and cancellation run the same teardown: disconnect, wait for
//! in-flight joins so a late handle is destroyed too, abort timers, answer
//! anyone still waiting, stop.

use crate::audio::AudioSource;
use crate::errors::AgentError;
use crate::observability::metrics;
use crate::state::{
    AgentCore, AgentStatus, Command, ConnectDecision, ConnectOutcome, Kickoff, Member,
    PlaybackOutcome, StartDecision, StartTrigger, TimerKind, Timings,
};
use crate::transport::{AudioPlayer, ConnectionId, PlayerStatus, TransportStatus, VoiceTransport};

use super::messages::{AgentMessage, InternalEvent};
use super::metrics::MailboxMonitor;

use common::types::VoiceEndpoint;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the agent mailbox.
const AGENT_CHANNEL_BUFFER: usize = 256;

/// Upper bound on waiting for in-flight joins during shutdown.
const SHUTDOWN_JOIN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Static inputs of the agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub endpoint: VoiceEndpoint,
    pub audio: AudioSource,
    pub timings: Timings,
    pub auto_join: bool,
}

/// Handle to the `AgentActor`.
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone, Debug)]
pub struct AgentActorHandle {
    sender: mpsc::Sender<AgentMessage>,
    cancel_token: CancellationToken,
}

impl AgentActorHandle {
    /// Join the voice channel and start playback.
    ///
    /// Joins an in-flight attempt instead of starting a second one.
    pub async fn connect(&self) -> Result<ConnectOutcome, AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::Connect { respond_to: tx }).await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the voice channel. Returns whether anything was torn down.
    pub async fn disconnect(&self) -> Result<bool, AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::Disconnect { respond_to: tx }).await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))
    }

    /// Start playback unless it is already starting or playing.
    pub async fn ensure_playing(&self) -> Result<PlaybackOutcome, AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::EnsurePlaying { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))?
    }

    /// Stop playback but stay connected.
    pub async fn stop_playback(&self) -> Result<(), AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::StopPlayback { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))
    }

    /// Deliver a transport status event.
    pub async fn transport_status(
        &self,
        connection_id: ConnectionId,
        status: TransportStatus,
    ) -> Result<(), AgentError> {
        self.send(AgentMessage::TransportStatus {
            connection_id,
            status,
        })
        .await
    }

    /// Deliver a player status event.
    pub async fn player_status(&self, status: PlayerStatus) -> Result<(), AgentError> {
        self.send(AgentMessage::PlayerStatus { status }).await
    }

    /// Deliver a membership snapshot of the target channel.
    pub async fn membership_changed(&self, members: &[Member]) -> Result<(), AgentError> {
        self.occupancy_changed(crate::state::human_count(members))
            .await
    }

    /// Deliver a new non-automated member count.
    pub async fn occupancy_changed(&self, count: usize) -> Result<(), AgentError> {
        self.send(AgentMessage::OccupancyChanged { count }).await
    }

    /// Get the current agent status.
    pub async fn get_status(&self) -> Result<AgentStatus, AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::GetStatus { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))
    }

    /// Disconnect and stop the actor. Resolves once teardown is complete.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        let (tx, rx) = oneshot::channel();
        self.send(AgentMessage::Shutdown { respond_to: tx }).await?;

        rx.await
            .map_err(|e| AgentError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor (same teardown as `shutdown`, without a reply).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Child token for tasks that must stop with the actor.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    async fn send(&self, message: AgentMessage) -> Result<(), AgentError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| AgentError::Internal(format!("channel send failed: {e}")))
    }
}

/// The `AgentActor` implementation.
pub struct AgentActor {
    core: AgentCore,
    transport: Arc<dyn VoiceTransport>,
    player: Arc<dyn AudioPlayer>,
    settings: AgentSettings,
    receiver: mpsc::Receiver<AgentMessage>,
    events_tx: mpsc::UnboundedSender<InternalEvent>,
    events_rx: mpsc::UnboundedReceiver<InternalEvent>,
    cancel_token: CancellationToken,
    connect_waiters: HashMap<u64, Vec<oneshot::Sender<Result<ConnectOutcome, AgentError>>>>,
    playback_waiters: HashMap<u64, Vec<oneshot::Sender<Result<PlaybackOutcome, AgentError>>>>,
    timers: HashMap<TimerKind, JoinHandle<()>>,
    joins_in_flight: usize,
    mailbox: MailboxMonitor,
}

impl AgentActor {
    /// Spawn the actor and return a handle plus the task's join handle.
    pub fn spawn(
        settings: AgentSettings,
        transport: Arc<dyn VoiceTransport>,
        player: Arc<dyn AudioPlayer>,
        cancel_token: CancellationToken,
    ) -> (AgentActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(AGENT_CHANNEL_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = Self {
            core: AgentCore::new(settings.timings, settings.auto_join),
            transport,
            player,
            settings,
            receiver,
            events_tx,
            events_rx,
            cancel_token: cancel_token.clone(),
            connect_waiters: HashMap::new(),
            playback_waiters: HashMap::new(),
            timers: HashMap::new(),
            joins_in_flight: 0,
            mailbox: MailboxMonitor::new(),
        };

        let task_handle = tokio::spawn(actor.run());

        (
            AgentActorHandle {
                sender,
                cancel_token,
            },
            task_handle,
        )
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "va.actor.agent", fields(endpoint = %self.settings.endpoint))]
    async fn run(mut self) {
        info!(
            target: "va.actor.agent",
            endpoint = %self.settings.endpoint,
            auto_join = self.settings.auto_join,
            "AgentActor started"
        );
        metrics::set_connection_state(self.core.connection_state());

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "va.actor.agent",
                        "AgentActor received cancellation signal"
                    );
                    self.teardown().await;
                    break;
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(AgentMessage::Shutdown { respond_to }) => {
                            info!(target: "va.actor.agent", "AgentActor shutting down");
                            self.teardown().await;
                            let _ = respond_to.send(());
                            break;
                        }
                        Some(message) => {
                            self.mailbox.record_enqueue();
                            self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                        }
                        None => {
                            info!(
                                target: "va.actor.agent",
                                "AgentActor channel closed, exiting"
                            );
                            self.teardown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "va.actor.agent",
            messages_processed = self.mailbox.messages_processed(),
            peak_mailbox_depth = self.mailbox.peak_depth(),
            "AgentActor stopped"
        );
    }

    /// Handle a single external message.
    async fn handle_message(&mut self, message: AgentMessage) {
        match message {
            AgentMessage::Connect { respond_to } => {
                let (decision, commands) = self.core.connect(Kickoff::Immediate);
                match decision {
                    ConnectDecision::Start { attempt } | ConnectDecision::Pending { attempt } => {
                        self.connect_waiters
                            .entry(attempt)
                            .or_default()
                            .push(respond_to);
                    }
                    ConnectDecision::AlreadyConnected => {
                        metrics::record_connect("already_connected");
                        let _ = respond_to.send(Ok(ConnectOutcome::AlreadyConnected));
                    }
                }
                self.execute(commands).await;
            }

            AgentMessage::Disconnect { respond_to } => {
                let (torn_down, commands) = self.core.disconnect();
                if torn_down {
                    info!(target: "va.actor.agent", "Disconnect requested");
                } else {
                    debug!(target: "va.actor.agent", "Disconnect requested while idle, nothing to do");
                }
                self.execute(commands).await;
                let _ = respond_to.send(torn_down);
            }

            AgentMessage::EnsurePlaying { respond_to } => {
                let (decision, commands) = self.core.ensure_playing(StartTrigger::Command);
                match decision {
                    StartDecision::Start { attempt } => {
                        self.playback_waiters
                            .entry(attempt)
                            .or_default()
                            .push(respond_to);
                    }
                    StartDecision::AlreadyPlaying => {
                        let _ = respond_to.send(Ok(PlaybackOutcome::AlreadyPlaying));
                    }
                    StartDecision::NotConnected => {
                        let _ = respond_to.send(Err(AgentError::NotConnected));
                    }
                }
                self.execute(commands).await;
            }

            AgentMessage::StopPlayback { respond_to } => {
                let commands = self.core.stop_playback();
                self.execute(commands).await;
                let _ = respond_to.send(());
            }

            AgentMessage::TransportStatus {
                connection_id,
                status,
            } => {
                debug!(
                    target: "va.actor.agent",
                    connection_id = %connection_id,
                    status = status.as_str(),
                    "Transport status"
                );
                let commands = self.core.transport_status(&connection_id, status);
                if status == TransportStatus::Disconnected
                    && commands
                        .iter()
                        .any(|c| matches!(c, Command::ArmTimer { .. }))
                {
                    warn!(
                        target: "va.actor.agent",
                        connection_id = %connection_id,
                        grace_ms = self.settings.timings.reconnect_grace.as_millis(),
                        "Transport disconnected, waiting for reconnect"
                    );
                }
                self.execute(commands).await;
            }

            AgentMessage::PlayerStatus { status } => {
                if let PlayerStatus::Error(reason) = &status {
                    warn!(
                        target: "va.actor.agent",
                        reason = %reason,
                        retry_ms = self.settings.timings.error_retry.as_millis(),
                        "Player error, retry scheduled"
                    );
                    metrics::record_player_fault();
                }
                let commands = self.core.player_status(&status);
                self.execute(commands).await;
            }

            AgentMessage::OccupancyChanged { count } => {
                debug!(target: "va.actor.agent", occupancy = count, "Occupancy changed");
                metrics::set_occupancy(count);
                let commands = self.core.occupancy_changed(count);
                self.execute(commands).await;
            }

            AgentMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.core.status());
            }

            // Handled in the run loop.
            AgentMessage::Shutdown { respond_to } => {
                let _ = respond_to.send(());
            }
        }
    }

    /// Handle the result of spawned work.
    async fn handle_event(&mut self, event: InternalEvent) {
        let commands = match event {
            InternalEvent::JoinFinished { attempt, result } => {
                self.joins_in_flight = self.joins_in_flight.saturating_sub(1);
                match &result {
                    Ok(handle) => info!(
                        target: "va.actor.agent",
                        attempt,
                        connection_id = %handle.id,
                        "Voice join completed"
                    ),
                    Err(e) => warn!(
                        target: "va.actor.agent",
                        attempt,
                        error = %e,
                        "Voice join failed"
                    ),
                }
                self.core.join_finished(attempt, result)
            }
            InternalEvent::PlaybackFinished {
                attempt,
                trigger,
                result,
            } => {
                metrics::record_playback_start(trigger, result.is_ok());
                if let Err(e) = &result {
                    warn!(
                        target: "va.actor.agent",
                        attempt,
                        trigger = trigger.as_str(),
                        error = %e,
                        "Playback start failed"
                    );
                    metrics::record_player_fault();
                }
                self.core.playback_finished(attempt, result)
            }
            InternalEvent::TimerFired { timer, generation } => {
                debug!(
                    target: "va.actor.agent",
                    timer = timer.as_str(),
                    generation,
                    "Timer fired"
                );
                self.timers.remove(&timer);
                self.core.timer_fired(timer, generation)
            }
        };
        self.execute(commands).await;
    }

    /// Execute core commands in order. Follow-up commands produced while
    /// executing one run before the rest of the batch.
    async fn execute(&mut self, commands: Vec<Command>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            let follow_up = self.execute_one(command).await;
            for command in follow_up.into_iter().rev() {
                queue.push_front(command);
            }
        }
        metrics::set_connection_state(self.core.connection_state());
    }

    async fn execute_one(&mut self, command: Command) -> Vec<Command> {
        match command {
            Command::Join { attempt } => {
                info!(
                    target: "va.actor.agent",
                    attempt,
                    endpoint = %self.settings.endpoint,
                    "Joining voice channel"
                );
                self.joins_in_flight += 1;
                let transport = Arc::clone(&self.transport);
                let endpoint = self.settings.endpoint;
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = transport.join_channel(&endpoint).await;
                    let _ = events.send(InternalEvent::JoinFinished { attempt, result });
                });
            }

            Command::Destroy { handle, reason } => {
                info!(
                    target: "va.actor.agent",
                    connection_id = %handle.id,
                    reason = reason.as_str(),
                    "Destroying voice connection"
                );
                metrics::record_teardown(reason);
                if let Err(e) = self.transport.destroy(&handle).await {
                    warn!(
                        target: "va.actor.agent",
                        connection_id = %handle.id,
                        error = %e,
                        "Voice connection destroy failed"
                    );
                }
            }

            Command::Subscribe { attempt, handle } => {
                let player_id = self.player.player_id();
                let result = self.transport.subscribe(&handle, &player_id).await;
                if let Err(e) = &result {
                    warn!(
                        target: "va.actor.agent",
                        attempt,
                        connection_id = %handle.id,
                        player_id = %player_id,
                        error = %e,
                        "Player subscribe failed, dropping connection"
                    );
                }
                return self.core.subscribe_finished(attempt, result);
            }

            Command::StartPlayback { attempt, trigger } => {
                debug!(
                    target: "va.actor.agent",
                    attempt,
                    trigger = trigger.as_str(),
                    "Starting playback"
                );
                let player = Arc::clone(&self.player);
                let source = self.settings.audio.clone();
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = match player.create_resource(&source).await {
                        Ok(resource) => player.play(resource).await,
                        Err(e) => Err(e),
                    };
                    let _ = events.send(InternalEvent::PlaybackFinished {
                        attempt,
                        trigger,
                        result,
                    });
                });
            }

            Command::StopPlayback => {
                if let Err(e) = self.player.stop().await {
                    warn!(target: "va.actor.agent", error = %e, "Player stop failed");
                }
            }

            Command::ArmTimer {
                timer,
                generation,
                after,
            } => {
                let events = self.events_tx.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = events.send(InternalEvent::TimerFired { timer, generation });
                });
                if let Some(previous) = self.timers.insert(timer, task) {
                    previous.abort();
                }
            }

            Command::CancelTimer(timer) => {
                if let Some(task) = self.timers.remove(&timer) {
                    task.abort();
                }
            }

            Command::ConnectResolved { attempt, result } => {
                metrics::record_connect(match &result {
                    Ok(ConnectOutcome::Joined) => "joined",
                    Ok(ConnectOutcome::AlreadyConnected) => "already_connected",
                    Err(AgentError::Superseded) => "superseded",
                    Err(_) => "failed",
                });
                for waiter in self.connect_waiters.remove(&attempt).unwrap_or_default() {
                    let _ = waiter.send(result.clone());
                }
            }

            Command::PlaybackResolved { attempt, result } => {
                for waiter in self.playback_waiters.remove(&attempt).unwrap_or_default() {
                    let _ = waiter.send(result.clone());
                }
            }
        }
        Vec::new()
    }

    /// Disconnect and release everything.
    async fn teardown(&mut self) {
        let (_, commands) = self.core.disconnect();
        self.execute(commands).await;

        // A join still in flight would leave a handle behind on the gateway.
        if self.joins_in_flight > 0 {
            let deadline = tokio::time::sleep(SHUTDOWN_JOIN_DRAIN_TIMEOUT);
            tokio::pin!(deadline);
            while self.joins_in_flight > 0 {
                tokio::select! {
                    () = &mut deadline => {
                        warn!(
                            target: "va.actor.agent",
                            joins_in_flight = self.joins_in_flight,
                            "Timed out waiting for in-flight joins"
                        );
                        break;
                    }
                    Some(event) = self.events_rx.recv() => {
                        self.handle_event(event).await;
                    }
                }
            }
        }

        for (_, task) in self.timers.drain() {
            task.abort();
        }
        for (_, waiters) in self.connect_waiters.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(AgentError::ShuttingDown));
            }
        }
        for (_, waiters) in self.playback_waiters.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(AgentError::ShuttingDown));
            }
        }

        info!(target: "va.actor.agent", "Agent teardown complete");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::{AudioResource, ConnectionHandle, PlayerId};
    use async_trait::async_trait;
    use common::types::{ChannelId, GuildId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        joins: AtomicUsize,
        destroys: AtomicUsize,
    }

    #[async_trait]
    impl VoiceTransport for CountingTransport {
        async fn join_channel(
            &self,
            endpoint: &VoiceEndpoint,
        ) -> Result<ConnectionHandle, AgentError> {
            let n = self.joins.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ConnectionHandle {
                id: ConnectionId(format!("conn-{n}")),
                endpoint: *endpoint,
            })
        }

        async fn subscribe(
            &self,
            _handle: &ConnectionHandle,
            _player: &PlayerId,
        ) -> Result<(), AgentError> {
            Ok(())
        }

        async fn destroy(&self, _handle: &ConnectionHandle) -> Result<(), AgentError> {
            self.destroys.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
    }

    #[async_trait]
    impl AudioPlayer for CountingPlayer {
        fn player_id(&self) -> PlayerId {
            PlayerId("player-1".to_string())
        }

        async fn create_resource(&self, _source: &AudioSource) -> Result<AudioResource, AgentError> {
            Ok(AudioResource {
                id: "res".to_string(),
            })
        }

        async fn play(&self, _resource: AudioResource) -> Result<(), AgentError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            endpoint: VoiceEndpoint::new(GuildId(10), ChannelId(20)),
            audio: AudioSource::unchecked("/tmp/loop.mp3"),
            timings: Timings::default(),
            auto_join: true,
        }
    }

    fn spawn_agent() -> (
        AgentActorHandle,
        JoinHandle<()>,
        Arc<CountingTransport>,
        Arc<CountingPlayer>,
    ) {
        let transport = Arc::new(CountingTransport::default());
        let player = Arc::new(CountingPlayer::default());
        let (handle, task) = AgentActor::spawn(
            settings(),
            Arc::clone(&transport) as Arc<dyn VoiceTransport>,
            Arc::clone(&player) as Arc<dyn AudioPlayer>,
            CancellationToken::new(),
        );
        (handle, task, transport, player)
    }

    #[tokio::test]
    async fn test_connect_and_play() {
        let (handle, _task, transport, player) = spawn_agent();

        assert_eq!(handle.connect().await.unwrap(), ConnectOutcome::Joined);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transport.joins.load(Ordering::SeqCst), 1);
        assert_eq!(player.plays.load(Ordering::SeqCst), 1);

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.connection, crate::state::ConnectionState::Connected);
        assert_eq!(status.playback, crate::state::PlaybackState::Playing);
        assert_eq!(status.connection_id, Some(ConnectionId("conn-1".to_string())));

        handle.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_connects_share_one_join() {
        let (handle, _task, transport, _player) = spawn_agent();

        let (a, b) = tokio::join!(handle.connect(), handle.connect());

        assert_eq!(a.unwrap(), ConnectOutcome::Joined);
        assert_eq!(b.unwrap(), ConnectOutcome::Joined);
        assert_eq!(transport.joins.load(Ordering::SeqCst), 1);

        assert_eq!(
            handle.connect().await.unwrap(),
            ConnectOutcome::AlreadyConnected
        );
        assert_eq!(transport.joins.load(Ordering::SeqCst), 1);

        handle.cancel();
    }

    #[tokio::test]
    async fn test_ensure_playing_without_connection() {
        let (handle, _task, _transport, player) = spawn_agent();

        assert_eq!(
            handle.ensure_playing().await,
            Err(AgentError::NotConnected)
        );
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);

        handle.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_before_returning() {
        let (handle, task, transport, _player) = spawn_agent();
        handle.connect().await.unwrap();

        handle.shutdown().await.unwrap();

        assert_eq!(transport.destroys.load(Ordering::SeqCst), 1);
        task.await.unwrap();
        assert!(handle.get_status().await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_tears_down() {
        let (handle, task, transport, _player) = spawn_agent();
        handle.connect().await.unwrap();

        handle.cancel();
        task.await.unwrap();

        assert!(handle.is_cancelled());
        assert_eq!(transport.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_child_token_cancelled_with_actor() {
        let (handle, _task, _transport, _player) = spawn_agent();
        let child = handle.child_token();

        assert!(!child.is_cancelled());
        handle.cancel();
        assert!(child.is_cancelled());
    }
}
