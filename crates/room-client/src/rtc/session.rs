//! Capability traits for the media transport.
//!
//! The transport itself (ICE, codecs, device capture) lives outside this
//! crate. Implementations raise [`RtcEvent`](super::events::RtcEvent)s
//! through the [`EventSink`] they are handed at construction.

use super::events::OutboundSignal;
use super::observers::EventSink;
use crate::config::Config;
use async_trait::async_trait;
use common::secret::SecretString;
use common::types::{ConnectionId, StreamId};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtcError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("media access denied: {0}")]
    MediaAccessDenied(String),

    #[error("signal rejected: {0}")]
    Signal(String),

    #[error("not connected")]
    NotConnected,
}

/// Result of a successful transport connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Identifier the transport assigned to our connection.
    pub connection_id: ConnectionId,
}

/// Capture and publish constraints for local media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub audio_enabled: bool,
    pub video_enabled: bool,

    /// Ideal capture width in pixels.
    pub width: u32,

    /// Ideal capture height in pixels.
    pub height: u32,

    pub frame_rate: u32,

    /// Mirror the local preview.
    pub mirror: bool,
}

impl PublishSettings {
    /// Settings from configuration and the user's current media preferences.
    #[must_use]
    pub fn from_config(config: &Config, audio_enabled: bool, video_enabled: bool) -> Self {
        Self {
            audio_enabled,
            video_enabled,
            width: config.video_width,
            height: config.video_height,
            frame_rate: config.video_frame_rate,
            mirror: false,
        }
    }
}

/// Handle to the published local stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHandle {
    pub stream_id: StreamId,
}

/// One transport session.
#[async_trait]
pub trait RtcSession: Send + Sync {
    /// Join the session using a broker-issued token.
    ///
    /// `client_data` is attached to our connection and shown to peers.
    async fn connect(
        &self,
        token: &SecretString,
        client_data: &str,
    ) -> Result<ConnectionInfo, RtcError>;

    /// Acquire local devices and publish.
    async fn publish(&self, settings: &PublishSettings) -> Result<LocalHandle, RtcError>;

    async fn set_audio_enabled(&self, enabled: bool) -> Result<(), RtcError>;

    async fn set_video_enabled(&self, enabled: bool) -> Result<(), RtcError>;

    /// Send a control signal.
    async fn signal(&self, signal: OutboundSignal) -> Result<(), RtcError>;

    /// Leave the session. Must tolerate being called when not connected.
    async fn disconnect(&self);
}

/// Creates transport sessions.
pub trait RtcSessionFactory: Send + Sync {
    /// Create an unconnected session that publishes its events to `sink`.
    fn init_session(&self, sink: EventSink) -> Arc<dyn RtcSession>;
}
