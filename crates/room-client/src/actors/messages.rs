//! Message and state types for the room actor.
//!
//! Commands arrive on an `mpsc` mailbox; request-reply uses `oneshot`.

use crate::chat::ChatMessage;
use crate::errors::RoomError;
use crate::roster::{GridLayout, RosterEntry};
use common::types::{ConnectionId, SessionId};
use serde::Serialize;
use std::fmt;
use tokio::sync::oneshot;

/// Lifecycle phase of the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// No session; the landing form is shown.
    #[default]
    Idle,
    /// Broker, connect and publish are in flight.
    Connecting,
    /// Connected and publishing.
    Active,
    /// Tearing down after a user leave.
    Leaving,
    /// A lifecycle error is on screen until the display window elapses.
    Errored,
}

impl RoomPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RoomPhase::Idle => "idle",
            RoomPhase::Connecting => "connecting",
            RoomPhase::Active => "active",
            RoomPhase::Leaving => "leaving",
            RoomPhase::Errored => "errored",
        }
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub session_id: SessionId,
    pub connection_id: ConnectionId,
    pub display_name: String,
}

/// Everything the presentation layer renders, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RoomSnapshot {
    pub phase: RoomPhase,
    pub session_id: Option<SessionId>,
    pub local_connection_id: Option<ConnectionId>,

    /// Local participant first, then remotes in arrival order.
    pub participants: Vec<RosterEntry>,
    pub grid: GridLayout,

    pub messages: Vec<ChatMessage>,
    pub unread: usize,
    pub chat_open: bool,

    /// Media preferences; applied to the next publish when not active.
    pub audio_enabled: bool,
    pub video_enabled: bool,

    /// Error screen text while `Errored`.
    pub error: Option<String>,
}

/// Messages sent to `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// Start joining a room.
    Join {
        session_id: String,
        display_name: String,
        /// Resolves once the attempt is active, failed, or cancelled.
        respond_to: oneshot::Sender<Result<JoinedRoom, RoomError>>,
    },

    /// Leave the room, cancel a pending join, or dismiss an error.
    Leave {
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Flip the local microphone. Responds with the new state.
    ToggleAudio {
        respond_to: oneshot::Sender<Result<bool, RoomError>>,
    },

    /// Flip the local camera. Responds with the new state.
    ToggleVideo {
        respond_to: oneshot::Sender<Result<bool, RoomError>>,
    },

    /// Send a chat message. Responds once the transport accepted it.
    SendChat {
        text: String,
        respond_to: oneshot::Sender<Result<ChatMessage, RoomError>>,
    },

    /// Open or close the chat view.
    SetChatOpen {
        open: bool,
        respond_to: oneshot::Sender<()>,
    },

    /// Check broker reachability.
    ProbeBroker { respond_to: oneshot::Sender<bool> },
}
