//! Ordered chat log with unread tracking.
//!
//! Insertion order is arrival order. The unread counter increments once per
//! inbound message while the chat view is closed and resets only when the
//! view goes from closed to open.

use super::wire::ChatPayload;
use super::SYSTEM_SENDER;
use serde::Serialize;

/// One entry in the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// `{sender}-{timestamp}-{sequence}`; unique within one log.
    pub id: String,
    pub text: String,
    pub sender: String,
    pub timestamp: i64,
    pub is_system: bool,
}

#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    unread: usize,
    open: bool,
    sequence: u64,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, text: String, sender: String, timestamp: i64, is_system: bool) -> ChatMessage {
        let message = ChatMessage {
            id: format!("{sender}-{timestamp}-{}", self.sequence),
            text,
            sender,
            timestamp,
            is_system,
        };
        self.sequence += 1;
        self.messages.push(message.clone());
        message
    }

    /// Append a message from another participant.
    pub fn append_inbound(&mut self, payload: ChatPayload) -> ChatMessage {
        if !self.open {
            self.unread += 1;
        }
        self.push(payload.text, payload.sender, payload.timestamp, false)
    }

    /// Append a message this client sent.
    pub fn append_local(&mut self, payload: ChatPayload) -> ChatMessage {
        self.push(payload.text, payload.sender, payload.timestamp, false)
    }

    /// Append a locally synthesized notice. Never counts as unread.
    pub fn append_system(&mut self, text: String, timestamp: i64) -> ChatMessage {
        self.push(text, SYSTEM_SENDER.to_string(), timestamp, true)
    }

    /// Open or close the chat view.
    pub fn set_open(&mut self, open: bool) {
        if open && !self.open {
            self.unread = 0;
        }
        self.open = open;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn unread(&self) -> usize {
        self.unread
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drop all messages and the unread count. The open flag is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.unread = 0;
    }
}
