//! Huddle room client library.
//!
//! Joins a multi-party audio/video room, tracks remote participants, and
//! carries text chat over the room's signaling channel, keeping the state the
//! UI renders consistent with asynchronous transport events.
//!
//! # Architecture
//!
//! ```text
//! RoomHandle -> RoomActor -> BrokerClient       (admission tokens over HTTP)
//!                         -> SessionAdapter     (media transport capability)
//!                         -> Roster, MessageLog (pure state)
//! ```
//!
//! # Modules
//!
//! - `actors` - room orchestrator actor and its handle
//! - `broker` - token broker HTTP client
//! - `chat` - chat wire codec, message log, presence notices
//! - `config` - configuration from environment
//! - `errors` - error types
//! - `observability` - metrics
//! - `roster` - participant roster and grid layout
//! - `rtc` - media transport boundary and session adapter

pub mod actors;
pub mod broker;
pub mod chat;
pub mod config;
pub mod errors;
pub mod observability;
pub mod roster;
pub mod rtc;
