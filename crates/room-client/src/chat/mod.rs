//! Text chat layered on the session's signaling channel.
//!
//! - [`wire`] - `chat` signal payload codec and text validation
//! - [`log`] - ordered message log with unread tracking
//! - [`presence`] - localized join/leave notices

pub mod log;
pub mod presence;
pub mod wire;

pub use log::{ChatMessage, MessageLog};
pub use presence::Locale;
pub use wire::{ChatPayload, DecodeError, CHAT_SIGNAL_TYPE};

/// Sender name carried by locally synthesized notices.
pub const SYSTEM_SENDER: &str = "system";
