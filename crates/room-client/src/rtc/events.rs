//! Events the media transport raises for one session.

use common::types::{ConnectionId, StreamId};

/// Kind of local or remote media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// A remote participant's published stream as first observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    /// Stable stream identifier; the roster keys on this.
    pub stream_id: StreamId,

    /// Connection that published the stream.
    pub connection_id: ConnectionId,

    /// Raw connection metadata supplied by the publisher at connect time.
    pub connection_data: String,

    pub audio_active: bool,
    pub video_active: bool,
}

/// A control signal received on the session's signaling channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSignal {
    /// Signal type without transport prefix (e.g. `chat`).
    pub signal_type: String,

    /// Opaque payload.
    pub data: String,

    /// Sending connection; `None` for server-originated signals.
    pub from: Option<ConnectionId>,
}

/// A control signal to send on the session's signaling channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSignal {
    pub signal_type: String,
    pub data: String,

    /// Recipients; empty means every connection in the session.
    pub to: Vec<ConnectionId>,
}

impl OutboundSignal {
    /// Signal addressed to every connection in the session.
    #[must_use]
    pub fn broadcast(signal_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            signal_type: signal_type.into(),
            data: data.into(),
            to: Vec::new(),
        }
    }
}

/// Notification raised by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcEvent {
    /// A remote participant published a stream.
    StreamAdded(RemoteStream),

    /// A remote stream went away.
    StreamRemoved { stream_id: StreamId, reason: String },

    /// A remote stream muted or unmuted a track.
    StreamPropertyChanged {
        stream_id: StreamId,
        kind: MediaKind,
        enabled: bool,
    },

    /// A control signal arrived.
    SignalReceived(InboundSignal),

    /// The transport ended the session (network loss, eviction, shutdown).
    SessionTerminated { reason: String },

    /// The transport hit an unrecoverable error.
    Exception { detail: String },
}

/// Discriminant of [`RtcEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamAdded,
    StreamRemoved,
    StreamPropertyChanged,
    SignalReceived,
    SessionTerminated,
    Exception,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [EventKind; 6] = [
        EventKind::StreamAdded,
        EventKind::StreamRemoved,
        EventKind::StreamPropertyChanged,
        EventKind::SignalReceived,
        EventKind::SessionTerminated,
        EventKind::Exception,
    ];
}

impl RtcEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            RtcEvent::StreamAdded(_) => EventKind::StreamAdded,
            RtcEvent::StreamRemoved { .. } => EventKind::StreamRemoved,
            RtcEvent::StreamPropertyChanged { .. } => EventKind::StreamPropertyChanged,
            RtcEvent::SignalReceived(_) => EventKind::SignalReceived,
            RtcEvent::SessionTerminated { .. } => EventKind::SessionTerminated,
            RtcEvent::Exception { .. } => EventKind::Exception,
        }
    }
}
