//! Actor runtime for the voice agent.
//!
//! ```text
//! AgentActor (singleton)
//! ├── owns AgentCore (connection, playback, occupancy, timers)
//! ├── spawns gateway joins and playback starts
//! └── spawns one sleep task per armed timer
//! ```
//!
//! Callers (ingress routes, `main`) only ever hold an `AgentActorHandle`.
//! Every input is serialized through the actor mailbox, so the core sees one
//! event at a time.
//!
//! # Modules
//!
//! - [`agent`] - `AgentActor` and its handle
//! - [`messages`] - Message types for the actor mailbox
//! - [`metrics`] - Mailbox depth monitoring

pub mod agent;
pub mod messages;
pub mod metrics;

pub use agent::{AgentActor, AgentActorHandle, AgentSettings};
pub use messages::AgentMessage;
pub use metrics::MailboxMonitor;
