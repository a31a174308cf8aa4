//! Room orchestrator.
//!
//! A single `RoomActor` owns every piece of room state: lifecycle phase,
//! roster, chat log, media preferences. The presentation layer drives it
//! through a cloneable `RoomHandle` and renders the `RoomSnapshot`s it
//! publishes on a watch channel.
//!
//! # Modules
//!
//! - [`room`] - `RoomActor` and `RoomHandle`
//! - [`messages`] - mailbox messages, phases and snapshots

pub mod messages;
pub mod room;

pub use messages::*;
pub use room::{RoomActor, RoomHandle};
