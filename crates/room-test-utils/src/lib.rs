//! # Room Test Utilities
//!
//! Shared test utilities for the room client.
//!
//! This crate provides mock implementations and fixtures so orchestrator
//! tests run without a broker or a media transport.
//!
//! ## Modules
//!
//! - `mock_broker` - Scripted token broker
//! - `mock_rtc` - Recording media transport that raises events on demand
//! - `fixtures` - Configuration, remote streams, chat payloads
//! - `harness` - `TestRoom`, a spawned actor wired to both mocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let room = TestRoom::spawn();
//!     room.handle.join("room-42", "Alice").await.unwrap();
//!
//!     room.session().add_remote("str_bob", "Bob");
//!     let snapshot = room.wait_for(|s| s.participants.len() == 2).await;
//! }
//! ```

pub mod fixtures;
pub mod harness;
pub mod mock_broker;
pub mod mock_rtc;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
pub use mock_broker::*;
pub use mock_rtc::*;
