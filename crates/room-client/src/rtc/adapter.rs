//! Session adapter: one transport session plus its observer registry.
//!
//! The adapter is single-use. It moves `Disconnected -> Connecting ->
//! Connected -> Closed`; once closed it never reconnects, and the
//! orchestrator builds a fresh adapter for the next join.
//!
//! A `disconnect()` issued while `connect()` is in flight wins: the late
//! connection is torn down and `connect()` reports failure.

use super::events::{EventKind, OutboundSignal};
use super::observers::{ObserverRegistry, Subscription};
use super::session::{LocalHandle, PublishSettings, RtcError, RtcSession, RtcSessionFactory};
use crate::errors::RoomError;
use common::secret::SecretString;
use common::types::ConnectionId;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AdapterState {
    Disconnected,
    Connecting,
    Connected { connection_id: ConnectionId },
    Closed,
}

/// Connection metadata attached to our connection, visible to peers.
#[must_use]
pub fn encode_client_data(display_name: &str) -> String {
    serde_json::json!({ "clientData": display_name }).to_string()
}

/// Owns one transport session for the orchestrator.
pub struct SessionAdapter {
    session: Arc<dyn RtcSession>,
    registry: ObserverRegistry,
    state: Mutex<AdapterState>,
}

impl SessionAdapter {
    /// Create an unconnected adapter with its own observer registry.
    #[must_use]
    pub fn new(factory: &dyn RtcSessionFactory) -> Self {
        let registry = ObserverRegistry::new();
        let session = factory.init_session(registry.sink());
        Self {
            session,
            registry,
            state: Mutex::new(AdapterState::Disconnected),
        }
    }

    fn state(&self) -> MutexGuard<'_, AdapterState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Subscribe to transport events of the given kinds.
    #[must_use]
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        self.registry.subscribe(kinds)
    }

    /// Our connection id once connected.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match &*self.state() {
            AdapterState::Connected { connection_id } => Some(connection_id.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.state(), AdapterState::Connected { .. })
    }

    /// Connect using a broker-issued token.
    ///
    /// # Errors
    ///
    /// `RoomError::Connect` if the transport refuses, if the adapter was
    /// already used, or if `disconnect()` was called before the transport
    /// answered.
    #[instrument(skip_all, fields(display_name = %display_name))]
    pub async fn connect(
        &self,
        token: &SecretString,
        display_name: &str,
    ) -> Result<ConnectionId, RoomError> {
        {
            let mut state = self.state();
            if *state != AdapterState::Disconnected {
                return Err(RoomError::Connect(
                    "session adapter already used".to_string(),
                ));
            }
            *state = AdapterState::Connecting;
        }

        let client_data = encode_client_data(display_name);
        let result = self.session.connect(token, &client_data).await;

        let outcome = {
            let mut state = self.state();
            let still_connecting = *state == AdapterState::Connecting;
            match (still_connecting, result) {
                (true, Ok(info)) => {
                    *state = AdapterState::Connected {
                        connection_id: info.connection_id.clone(),
                    };
                    Ok(info.connection_id)
                }
                (true, Err(e)) => {
                    *state = AdapterState::Disconnected;
                    Err(Some(RoomError::Connect(e.to_string())))
                }
                // disconnect() ran while we were waiting.
                (false, Ok(_)) => Err(None),
                (false, Err(e)) => Err(Some(RoomError::Connect(e.to_string()))),
            }
        };

        match outcome {
            Ok(connection_id) => {
                info!(target: "room.rtc.adapter", connection_id = %connection_id, "Connected");
                Ok(connection_id)
            }
            Err(None) => {
                debug!(target: "room.rtc.adapter", "Disconnect raced connect, tearing down");
                self.session.disconnect().await;
                Err(RoomError::Connect(
                    "disconnected while connecting".to_string(),
                ))
            }
            Err(Some(err)) => {
                warn!(target: "room.rtc.adapter", error = %err, "Connect failed");
                Err(err)
            }
        }
    }

    /// Publish local media.
    ///
    /// # Errors
    ///
    /// - `RoomError::MediaAccess` if device permission is denied
    /// - `RoomError::Connect` if not connected or the transport fails
    #[instrument(skip_all, fields(audio = settings.audio_enabled, video = settings.video_enabled))]
    pub async fn publish_local(&self, settings: &PublishSettings) -> Result<LocalHandle, RoomError> {
        if !self.is_connected() {
            return Err(RoomError::Connect(RtcError::NotConnected.to_string()));
        }

        self.session.publish(settings).await.map_err(|e| match e {
            RtcError::MediaAccessDenied(detail) => RoomError::MediaAccess(detail),
            other => RoomError::Connect(other.to_string()),
        })
    }

    /// Mute or unmute the local microphone.
    ///
    /// # Errors
    ///
    /// `RoomError::Connect` if not connected or the transport refuses.
    pub async fn set_local_audio(&self, enabled: bool) -> Result<(), RoomError> {
        if !self.is_connected() {
            return Err(RoomError::Connect(RtcError::NotConnected.to_string()));
        }
        self.session
            .set_audio_enabled(enabled)
            .await
            .map_err(|e| RoomError::Connect(e.to_string()))
    }

    /// Enable or disable the local camera.
    ///
    /// # Errors
    ///
    /// `RoomError::Connect` if not connected or the transport refuses.
    pub async fn set_local_video(&self, enabled: bool) -> Result<(), RoomError> {
        if !self.is_connected() {
            return Err(RoomError::Connect(RtcError::NotConnected.to_string()));
        }
        self.session
            .set_video_enabled(enabled)
            .await
            .map_err(|e| RoomError::Connect(e.to_string()))
    }

    /// Send a control signal.
    ///
    /// # Errors
    ///
    /// `RoomError::SignalDelivery` if not connected or the transport rejects it.
    #[instrument(skip_all, fields(signal_type = %signal.signal_type))]
    pub async fn send_signal(&self, signal: OutboundSignal) -> Result<(), RoomError> {
        if !self.is_connected() {
            return Err(RoomError::SignalDelivery(
                RtcError::NotConnected.to_string(),
            ));
        }
        self.session
            .signal(signal)
            .await
            .map_err(|e| RoomError::SignalDelivery(e.to_string()))
    }

    /// Leave the session. Safe to call more than once.
    pub async fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.state(), AdapterState::Closed);

        match previous {
            AdapterState::Connected { connection_id } => {
                info!(target: "room.rtc.adapter", connection_id = %connection_id, "Disconnecting");
                self.session.disconnect().await;
            }
            // connect() observes Closed and tears down the late connection.
            AdapterState::Connecting => {
                debug!(target: "room.rtc.adapter", "Disconnect requested during connect");
            }
            AdapterState::Disconnected | AdapterState::Closed => {}
        }
    }
}

impl std::fmt::Debug for SessionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAdapter")
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rtc::events::RtcEvent;
    use crate::rtc::observers::EventSink;
    use crate::rtc::session::ConnectionInfo;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct StubSession {
        gate: Option<Arc<Notify>>,
        deny_media: bool,
        disconnects: AtomicUsize,
        signals: AtomicUsize,
        client_data: Mutex<Option<String>>,
    }

    #[async_trait]
    impl RtcSession for StubSession {
        async fn connect(
            &self,
            _token: &SecretString,
            client_data: &str,
        ) -> Result<ConnectionInfo, RtcError> {
            *self.client_data.lock().unwrap() = Some(client_data.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ConnectionInfo {
                connection_id: ConnectionId::new("con_local"),
            })
        }

        async fn publish(&self, _settings: &PublishSettings) -> Result<LocalHandle, RtcError> {
            if self.deny_media {
                return Err(RtcError::MediaAccessDenied("NotAllowedError".to_string()));
            }
            Ok(LocalHandle {
                stream_id: common::types::StreamId::new("str_local"),
            })
        }

        async fn set_audio_enabled(&self, _enabled: bool) -> Result<(), RtcError> {
            Ok(())
        }

        async fn set_video_enabled(&self, _enabled: bool) -> Result<(), RtcError> {
            Ok(())
        }

        async fn signal(&self, _signal: OutboundSignal) -> Result<(), RtcError> {
            self.signals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubFactory {
        session: Arc<StubSession>,
        sink: Mutex<Option<EventSink>>,
    }

    impl StubFactory {
        fn new(session: StubSession) -> Self {
            Self {
                session: Arc::new(session),
                sink: Mutex::new(None),
            }
        }
    }

    impl RtcSessionFactory for StubFactory {
        fn init_session(&self, sink: EventSink) -> Arc<dyn RtcSession> {
            *self.sink.lock().unwrap() = Some(sink);
            self.session.clone()
        }
    }

    fn settings() -> PublishSettings {
        PublishSettings {
            audio_enabled: true,
            video_enabled: true,
            width: 1280,
            height: 720,
            frame_rate: 15,
            mirror: false,
        }
    }

    #[test]
    fn test_encode_client_data() {
        assert_eq!(encode_client_data("Alice"), r#"{"clientData":"Alice"}"#);
        assert_eq!(
            encode_client_data("Bob \"B\""),
            r#"{"clientData":"Bob \"B\""}"#
        );
    }

    #[tokio::test]
    async fn test_connect_publish_disconnect() {
        let factory = StubFactory::new(StubSession::default());
        let adapter = SessionAdapter::new(&factory);
        let token = SecretString::from("tok");

        let connection_id = adapter.connect(&token, "Alice").await.unwrap();
        assert_eq!(connection_id.as_str(), "con_local");
        assert_eq!(adapter.connection_id(), Some(connection_id));
        assert_eq!(
            factory.session.client_data.lock().unwrap().as_deref(),
            Some(r#"{"clientData":"Alice"}"#)
        );

        let handle = adapter.publish_local(&settings()).await.unwrap();
        assert_eq!(handle.stream_id.as_str(), "str_local");

        adapter.disconnect().await;
        adapter.disconnect().await;
        assert_eq!(factory.session.disconnects.load(Ordering::SeqCst), 1);
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_adapter_is_single_use() {
        let factory = StubFactory::new(StubSession::default());
        let adapter = SessionAdapter::new(&factory);
        let token = SecretString::from("tok");

        adapter.connect(&token, "Alice").await.unwrap();
        adapter.disconnect().await;

        let result = adapter.connect(&token, "Alice").await;
        assert!(matches!(result, Err(RoomError::Connect(_))));
    }

    #[tokio::test]
    async fn test_disconnect_during_connect_wins() {
        let gate = Arc::new(Notify::new());
        let factory = StubFactory::new(StubSession {
            gate: Some(gate.clone()),
            ..StubSession::default()
        });
        let adapter = Arc::new(SessionAdapter::new(&factory));
        let token = SecretString::from("tok");

        let connecting = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.connect(&token, "Alice").await })
        };
        while *adapter.state() != AdapterState::Connecting {
            tokio::task::yield_now().await;
        }

        adapter.disconnect().await;
        gate.notify_one();

        let result = connecting.await.unwrap();
        assert!(matches!(result, Err(RoomError::Connect(_))));
        assert!(!adapter.is_connected());
        // The late connection was torn down exactly once.
        assert_eq!(factory.session.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_media_denied() {
        let factory = StubFactory::new(StubSession {
            deny_media: true,
            ..StubSession::default()
        });
        let adapter = SessionAdapter::new(&factory);

        adapter
            .connect(&SecretString::from("tok"), "Alice")
            .await
            .unwrap();
        let result = adapter.publish_local(&settings()).await;
        assert!(matches!(result, Err(RoomError::MediaAccess(_))));
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let factory = StubFactory::new(StubSession::default());
        let adapter = SessionAdapter::new(&factory);

        assert!(matches!(
            adapter.publish_local(&settings()).await,
            Err(RoomError::Connect(_))
        ));
        assert!(matches!(
            adapter
                .send_signal(OutboundSignal::broadcast("chat", "{}"))
                .await,
            Err(RoomError::SignalDelivery(_))
        ));
        assert_eq!(factory.session.signals.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let factory = StubFactory::new(StubSession::default());
        let adapter = SessionAdapter::new(&factory);
        let mut sub = adapter.subscribe(&[EventKind::SessionTerminated]);

        let sink = factory.sink.lock().unwrap().clone().unwrap();
        sink.emit(RtcEvent::SessionTerminated {
            reason: "forceDisconnectByServer".to_string(),
        });

        assert!(matches!(
            sub.recv().await,
            Some(RtcEvent::SessionTerminated { .. })
        ));
    }
}
