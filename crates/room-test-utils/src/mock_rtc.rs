//! Mock media transport.
//!
//! [`MockRtcFactory`] hands out [`MockRtcSession`]s that record every call
//! and let a test raise transport events as if remote peers were acting.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::MockRtcFactory;
//!
//! let factory = MockRtcFactory::new();
//! // ... join a room through the orchestrator ...
//! let session = factory.latest_session().unwrap();
//! session.add_remote("str_bob", "Bob");
//! ```

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::{ConnectionId, StreamId};
use room_client::rtc::{
    ConnectionInfo, EventSink, InboundSignal, LocalHandle, MediaKind, OutboundSignal,
    PublishSettings, RemoteStream, RtcError, RtcEvent, RtcSession, RtcSessionFactory,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::fixtures::remote_stream;

/// Scripted transport behavior, shared by every session of one factory.
#[derive(Debug, Clone, Default)]
pub struct MockRtcBehavior {
    /// `connect` fails with this detail.
    pub fail_connect: Option<String>,
    /// `publish` fails with `MediaAccessDenied`.
    pub deny_media: bool,
    /// `signal` fails.
    pub fail_signal: bool,
    /// Sent signals come back as `SignalReceived` from our own connection.
    pub echo_signals: bool,
    /// When set, `connect` waits for one `notify_one`.
    pub connect_gate: Option<Arc<Notify>>,
    /// Local track toggles fail with `NotConnected`.
    pub fail_toggle: bool,
    /// When set, each local track toggle waits for one `notify_one`.
    pub toggle_gate: Option<Arc<Notify>>,
}

/// Factory producing recording sessions.
#[derive(Default)]
pub struct MockRtcFactory {
    behavior: Arc<Mutex<MockRtcBehavior>>,
    sessions: Mutex<Vec<Arc<MockRtcSession>>>,
}

impl MockRtcFactory {
    /// A transport where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_behavior(behavior: MockRtcBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Change behavior for current and future sessions.
    pub fn update(&self, f: impl FnOnce(&mut MockRtcBehavior)) {
        f(&mut self.behavior.lock().unwrap());
    }

    /// The most recently created session.
    pub fn latest_session(&self) -> Option<Arc<MockRtcSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }

    /// Number of sessions created so far.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl RtcSessionFactory for MockRtcFactory {
    fn init_session(&self, sink: EventSink) -> Arc<dyn RtcSession> {
        let session = Arc::new(MockRtcSession {
            sink,
            behavior: Arc::clone(&self.behavior),
            connection_id: ConnectionId::new(format!("con_{}", Uuid::new_v4().simple())),
            state: Mutex::new(SessionState::default()),
        });
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        session
    }
}

#[derive(Debug, Default)]
struct SessionState {
    connect_attempts: usize,
    connected: bool,
    token: Option<String>,
    client_data: Option<String>,
    published: Option<PublishSettings>,
    audio_enabled: Option<bool>,
    video_enabled: Option<bool>,
    sent: Vec<OutboundSignal>,
    disconnects: usize,
}

/// One recording transport session.
pub struct MockRtcSession {
    sink: EventSink,
    behavior: Arc<Mutex<MockRtcBehavior>>,
    connection_id: ConnectionId,
    state: Mutex<SessionState>,
}

impl MockRtcSession {
    fn behavior(&self) -> MockRtcBehavior {
        self.behavior.lock().unwrap().clone()
    }

    async fn toggle(&self) -> Result<(), RtcError> {
        let behavior = self.behavior();
        if let Some(gate) = behavior.toggle_gate {
            gate.notified().await;
        }
        if behavior.fail_toggle {
            return Err(RtcError::NotConnected);
        }
        Ok(())
    }

    /// Connection id this session reports on connect.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id.clone()
    }

    /// Raise an arbitrary transport event.
    pub fn emit(&self, event: RtcEvent) {
        self.sink.emit(event);
    }

    /// A remote peer publishes a stream. Returns what was announced.
    pub fn add_remote(&self, stream_id: &str, display_name: &str) -> RemoteStream {
        let stream = remote_stream(stream_id, display_name);
        self.emit(RtcEvent::StreamAdded(stream.clone()));
        stream
    }

    /// A remote stream goes away.
    pub fn remove_remote(&self, stream_id: &str) {
        self.emit(RtcEvent::StreamRemoved {
            stream_id: StreamId::new(stream_id),
            reason: "disconnect".to_string(),
        });
    }

    /// A remote stream toggles a track.
    pub fn set_remote_media(&self, stream_id: &str, kind: MediaKind, enabled: bool) {
        self.emit(RtcEvent::StreamPropertyChanged {
            stream_id: StreamId::new(stream_id),
            kind,
            enabled,
        });
    }

    /// A signal arrives from `from`.
    pub fn signal_from(&self, from: &ConnectionId, signal_type: &str, data: &str) {
        self.emit(RtcEvent::SignalReceived(InboundSignal {
            signal_type: signal_type.to_string(),
            data: data.to_string(),
            from: Some(from.clone()),
        }));
    }

    /// The transport ends the session.
    pub fn terminate(&self, reason: &str) {
        self.emit(RtcEvent::SessionTerminated {
            reason: reason.to_string(),
        });
    }

    /// The transport hits an unrecoverable error.
    pub fn raise_exception(&self, detail: &str) {
        self.emit(RtcEvent::Exception {
            detail: detail.to_string(),
        });
    }

    /// Signals accepted by `signal`, in order.
    pub fn sent_signals(&self) -> Vec<OutboundSignal> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Calls to `connect`, counted before any gate is awaited.
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Token presented on connect.
    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    /// Connection metadata presented on connect.
    pub fn client_data(&self) -> Option<String> {
        self.state.lock().unwrap().client_data.clone()
    }

    pub fn published_settings(&self) -> Option<PublishSettings> {
        self.state.lock().unwrap().published.clone()
    }

    /// Last value passed to `set_audio_enabled`.
    pub fn audio_enabled(&self) -> Option<bool> {
        self.state.lock().unwrap().audio_enabled
    }

    /// Last value passed to `set_video_enabled`.
    pub fn video_enabled(&self) -> Option<bool> {
        self.state.lock().unwrap().video_enabled
    }
}

#[async_trait]
impl RtcSession for MockRtcSession {
    async fn connect(
        &self,
        token: &SecretString,
        client_data: &str,
    ) -> Result<ConnectionInfo, RtcError> {
        let behavior = self.behavior();
        self.state.lock().unwrap().connect_attempts += 1;
        if let Some(gate) = behavior.connect_gate {
            gate.notified().await;
        }
        if let Some(detail) = behavior.fail_connect {
            return Err(RtcError::Connect(detail));
        }

        let mut state = self.state.lock().unwrap();
        state.connected = true;
        state.token = Some(token.expose_secret().to_string());
        state.client_data = Some(client_data.to_string());

        Ok(ConnectionInfo {
            connection_id: self.connection_id.clone(),
        })
    }

    async fn publish(&self, settings: &PublishSettings) -> Result<LocalHandle, RtcError> {
        if self.behavior().deny_media {
            return Err(RtcError::MediaAccessDenied(
                "camera permission denied".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(RtcError::NotConnected);
        }
        state.published = Some(settings.clone());

        Ok(LocalHandle {
            stream_id: StreamId::new(format!("str_{}", self.connection_id)),
        })
    }

    async fn set_audio_enabled(&self, enabled: bool) -> Result<(), RtcError> {
        self.toggle().await?;
        self.state.lock().unwrap().audio_enabled = Some(enabled);
        Ok(())
    }

    async fn set_video_enabled(&self, enabled: bool) -> Result<(), RtcError> {
        self.toggle().await?;
        self.state.lock().unwrap().video_enabled = Some(enabled);
        Ok(())
    }

    async fn signal(&self, signal: OutboundSignal) -> Result<(), RtcError> {
        let behavior = self.behavior();
        if behavior.fail_signal {
            return Err(RtcError::Signal("signaling channel closed".to_string()));
        }

        self.state.lock().unwrap().sent.push(signal.clone());

        if behavior.echo_signals {
            self.signal_from(&self.connection_id, &signal.signal_type, &signal.data);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.disconnects += 1;
    }
}
