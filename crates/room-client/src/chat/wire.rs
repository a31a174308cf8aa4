//! Chat wire format.
//!
//! A chat message travels as a signal of type `chat` broadcast to every
//! connection. The payload is JSON:
//!
//! ```json
//! {"text": "hi", "sender": "Alice", "timestamp": 1700000000000}
//! ```
//!
//! Unknown fields are ignored; any missing field is a decode error.

use crate::errors::InvalidMessageReason;
use crate::rtc::events::{InboundSignal, OutboundSignal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signal type carrying chat payloads.
pub const CHAT_SIGNAL_TYPE: &str = "chat";

/// Prefix some transports put in front of application signal types.
const SIGNAL_TYPE_PREFIX: &str = "signal:";

/// Chat payload as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: String,
    pub sender: String,

    /// Wall-clock milliseconds at the sender.
    pub timestamp: i64,
}

/// Why an inbound chat signal was dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a chat signal: {0}")]
    WrongType(String),

    #[error("malformed chat payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid chat payload: {0}")]
    Invalid(InvalidMessageReason),
}

/// Whether a signal type names the chat channel.
#[must_use]
pub fn is_chat_signal(signal_type: &str) -> bool {
    signal_type.strip_prefix(SIGNAL_TYPE_PREFIX).unwrap_or(signal_type) == CHAT_SIGNAL_TYPE
}

/// Trim and bound user-entered text.
///
/// # Errors
///
/// `EmptyText` when nothing remains after trimming, `TooLong` when the
/// trimmed text exceeds `max_length` characters.
pub fn validate_text(text: &str, max_length: usize) -> Result<String, InvalidMessageReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InvalidMessageReason::EmptyText);
    }

    let len = trimmed.chars().count();
    if len > max_length {
        return Err(InvalidMessageReason::TooLong {
            len,
            max: max_length,
        });
    }

    Ok(trimmed.to_string())
}

/// Build the broadcast signal for a payload.
#[must_use]
pub fn encode(payload: &ChatPayload) -> OutboundSignal {
    let data = serde_json::json!({
        "text": payload.text,
        "sender": payload.sender,
        "timestamp": payload.timestamp,
    });
    OutboundSignal::broadcast(CHAT_SIGNAL_TYPE, data.to_string())
}

/// Parse and validate an inbound chat signal.
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode(signal: &InboundSignal, max_length: usize) -> Result<ChatPayload, DecodeError> {
    if !is_chat_signal(&signal.signal_type) {
        return Err(DecodeError::WrongType(signal.signal_type.clone()));
    }

    let payload: ChatPayload = serde_json::from_str(&signal.data)?;

    let text = validate_text(&payload.text, max_length).map_err(DecodeError::Invalid)?;
    let sender = payload.sender.trim();
    if sender.is_empty() {
        return Err(DecodeError::Invalid(InvalidMessageReason::NoSender));
    }

    Ok(ChatPayload {
        text,
        sender: sender.to_string(),
        timestamp: payload.timestamp,
    })
}
