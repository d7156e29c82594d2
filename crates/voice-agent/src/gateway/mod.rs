//! Voice gateway adapter.
//!
//! The gateway sidecar owns the chat-platform session. Outbound, the agent
//! drives voice connections and the player through [`client`]. Inbound, the
//! gateway forwards slash commands, status events, membership snapshots and
//! chat messages to the [`routes`] guarded by [`auth`].

pub mod auth;
pub mod client;
pub mod routes;

pub use auth::{require_ingress_token, IngressAuth};
pub use client::{GatewayClient, GatewayPlayer};
pub use routes::{ingress_router, IngressState};
