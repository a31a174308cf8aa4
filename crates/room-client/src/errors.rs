//! Room client error types.
//!
//! Lifecycle errors (broker, token, connect, media, session loss) drive the
//! orchestrator into `Errored`; command errors are returned to the caller.
//! Broker response bodies and tokens never appear in error messages.

use crate::actors::RoomPhase;
use thiserror::Error;

/// Failure talking to the token broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Broker answered with a non-success status.
    #[error("broker returned status {0}")]
    Status(u16),

    /// Broker could not be reached (DNS, TLS, timeout, reset).
    #[error("broker unreachable: {0}")]
    Unreachable(String),

    /// Broker answered 2xx with a body we could not use.
    #[error("invalid broker response: {0}")]
    InvalidResponse(String),
}

/// Why a chat send was rejected before reaching the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidMessageReason {
    /// No session is active.
    #[error("no active session")]
    NoSession,

    /// Text is empty after trimming.
    #[error("message text is empty")]
    EmptyText,

    /// Text exceeds the configured bound.
    #[error("message is {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },

    /// No local display name to send as.
    #[error("no sender identity")]
    NoSender,
}

/// Room client error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Room creation failed for a reason other than "already exists".
    #[error("Room admission failed: {0}")]
    Broker(BrokerError),

    /// Connection token issuance failed.
    #[error("Token request failed: {0}")]
    Token(BrokerError),

    /// Transport-level join failure.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Camera/microphone permission denied.
    #[error("Media access denied: {0}")]
    MediaAccess(String),

    /// Chat message failed validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(InvalidMessageReason),

    /// Command issued in a state that forbids it.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        state: RoomPhase,
        operation: &'static str,
    },

    /// Join parameters rejected before any network activity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chat signal reached the transport but was rejected.
    #[error("Signal delivery failed: {0}")]
    SignalDelivery(String),

    /// The transport ended the session.
    #[error("Session terminated: {0}")]
    SessionTerminated(String),

    /// The transport reported an unrecoverable exception.
    #[error("Session exception: {0}")]
    SessionException(String),

    /// A leave arrived before the join attempt completed.
    #[error("Join cancelled")]
    JoinCancelled,

    /// Actor channel failure or other internal fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Whether this error ends the current session attempt (drives `Errored`).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            RoomError::Broker(_)
                | RoomError::Token(_)
                | RoomError::Connect(_)
                | RoomError::MediaAccess(_)
                | RoomError::SessionTerminated(_)
                | RoomError::SessionException(_)
        )
    }

    /// Bounded label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RoomError::Broker(_) => "broker",
            RoomError::Token(_) => "token",
            RoomError::Connect(_) => "connect",
            RoomError::MediaAccess(_) => "media_access",
            RoomError::InvalidMessage(_) => "invalid_message",
            RoomError::InvalidState { .. } => "invalid_state",
            RoomError::InvalidInput(_) => "invalid_input",
            RoomError::SignalDelivery(_) => "signal_delivery",
            RoomError::SessionTerminated(_) => "session_terminated",
            RoomError::SessionException(_) => "session_exception",
            RoomError::JoinCancelled => "join_cancelled",
            RoomError::Internal(_) => "internal",
        }
    }

    /// Text for the error screen shown during the error window.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RoomError::Broker(BrokerError::Unreachable(_)) => {
                "The meeting server is unreachable".to_string()
            }
            RoomError::MediaAccess(_) => "Camera and microphone access denied".to_string(),
            RoomError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}
