//! # Voice Agent Test Utilities
//!
//! Mock collaborators and fixtures for driving the agent actor without a
//! voice gateway.
//!
//! ## Modules
//!
//! - `mock_transport` - Counting voice transport with scriptable failures
//! - `mock_player` - Counting audio player with scriptable failures
//! - `fixtures` - Endpoint, members, settings and a spawned test agent
//!
//! ## Usage
//!
//! ```rust,ignore
//! use voice_agent_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let agent = TestAgent::spawn(test_settings());
//!
//!     agent.handle.membership_changed(&members(1)).await.unwrap();
//!     settle().await;
//!
//!     assert_eq!(agent.transport.joins(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_player;
pub mod mock_transport;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_player::*;
pub use mock_transport::*;
