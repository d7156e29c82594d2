//! Voice Agent Library
//!
//! A presence-triggered voice agent: it joins one voice channel and loops a
//! fixed audio clip for as long as people are listening.
//!
//! - Joins when the first non-automated member arrives, leaves when the last
//!   one goes
//! - Restarts the clip every time it finishes; retries after a player fault
//! - Rides out transient transport drops within a reconnect grace window
//! - Accepts explicit join/quit commands and answers text triggers
//!
//! # Architecture
//!
//! ```text
//! voice gateway ──HTTP──▶ gateway::routes ──▶ AgentActorHandle
//!                                                   │
//!                                              AgentActor
//!                                              ├── AgentCore (pure state machines)
//!                                              └── GatewayClient / GatewayPlayer ──HTTP──▶ voice gateway
//! ```
//!
//! # Modules
//!
//! - [`state`] - Connection, playback and occupancy state machines
//! - [`actors`] - Actor that executes the state machines' commands
//! - [`gateway`] - Voice gateway client and ingress routes
//! - [`transport`] - Collaborator traits and status types
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with HTTP mapping

pub mod actors;
pub mod audio;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod observability;
pub mod state;
pub mod transport;
pub mod triggers;
