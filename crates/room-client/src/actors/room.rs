//! `RoomActor` - owns the lifecycle of one room client.
//!
//! All state transitions run on the actor task. Network work (broker,
//! connect, publish, chat send) runs in spawned tasks whose results re-enter
//! the loop on an internal completion channel, tagged with the join attempt
//! that started them. A completion from an older attempt is discarded.
//!
//! ```text
//! Idle -> Connecting -> Active -> Leaving -> Idle
//!             |            |
//!             +-> Errored <+   (auto-returns to Idle after the display window)
//! ```
//!
//! Transport events are only read while `Active`; events raised during
//! `Connecting` stay buffered in the subscription and are applied in order
//! once the join completes.

use super::messages::{JoinedRoom, RoomMessage, RoomPhase, RoomSnapshot};
use crate::broker::AdmissionBroker;
use crate::chat::{presence, wire, ChatMessage, ChatPayload, MessageLog};
use crate::config::Config;
use crate::errors::{InvalidMessageReason, RoomError};
use crate::observability::metrics;
use crate::roster::{LocalParticipant, Roster, RosterChange};
use crate::rtc::{
    EventKind, InboundSignal, MediaKind, PublishSettings, RtcEvent, RtcSessionFactory,
    SessionAdapter, Subscription,
};
use common::types::{ConnectionId, SessionId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 64;

/// Minimum room id length accepted by `join`.
pub const MIN_SESSION_ID_LEN: usize = 3;

/// Minimum display name length accepted by `join`.
pub const MIN_DISPLAY_NAME_LEN: usize = 2;

/// Handle to a `RoomActor`.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    snapshots: watch::Receiver<RoomSnapshot>,
}

impl RoomHandle {
    /// Join a room. Resolves when the room is active or the attempt failed.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless idle
    /// - `InvalidInput` for a room id shorter than 3 or a name shorter than 2
    /// - any lifecycle error from the broker or transport
    /// - `JoinCancelled` if `leave()` ran first
    pub async fn join(
        &self,
        session_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<JoinedRoom, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Join {
                session_id: session_id.into(),
                display_name: display_name.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the room, cancel a pending join, or dismiss an error.
    ///
    /// # Errors
    ///
    /// `InvalidState` when idle or already leaving.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Leave { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Flip the microphone. Returns the new state.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless active.
    pub async fn toggle_audio(&self) -> Result<bool, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ToggleAudio { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Flip the camera. Returns the new state.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless active.
    pub async fn toggle_video(&self) -> Result<bool, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ToggleVideo { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Send a chat message to everyone in the room.
    ///
    /// Resolves after the transport accepted the signal and the message was
    /// appended to the local log.
    ///
    /// # Errors
    ///
    /// - `InvalidMessage` for empty or oversized text, or without a session
    /// - `SignalDelivery` if the transport rejected the signal
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<ChatMessage, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::SendChat {
                text: text.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Open or close the chat view. Opening resets the unread count.
    pub async fn set_chat_open(&self, open: bool) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::SetChatOpen {
                open,
                respond_to: tx,
            })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))
    }

    /// Whether the broker answers its configuration endpoint.
    pub async fn probe_broker(&self) -> Result<bool, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ProbeBroker { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the actor, tearing down any live session.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Results of off-loop work, fed back into the actor.
#[derive(Debug)]
enum Completion {
    Join {
        attempt: u64,
        result: Result<ConnectionId, RoomError>,
    },
    Toggled {
        attempt: u64,
        kind: MediaKind,
        enabled: bool,
        result: Result<(), RoomError>,
        respond_to: oneshot::Sender<Result<bool, RoomError>>,
    },
    ChatSent {
        attempt: u64,
        payload: ChatPayload,
        result: Result<(), RoomError>,
        respond_to: oneshot::Sender<Result<ChatMessage, RoomError>>,
    },
}

/// The session the actor is currently driving.
struct LiveSession {
    session_id: SessionId,
    display_name: String,
    adapter: Arc<SessionAdapter>,
    events: Subscription,
    connection_id: Option<ConnectionId>,
}

/// Local media preferences; survive across joins.
#[derive(Debug, Clone, Copy)]
struct MediaPrefs {
    audio: bool,
    video: bool,
}

impl MediaPrefs {
    fn get(self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.audio,
            MediaKind::Video => self.video,
        }
    }

    fn set(&mut self, kind: MediaKind, enabled: bool) {
        match kind {
            MediaKind::Audio => self.audio = enabled,
            MediaKind::Video => self.video = enabled,
        }
    }
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    config: Config,
    broker: Arc<dyn AdmissionBroker>,
    factory: Arc<dyn RtcSessionFactory>,
    receiver: mpsc::Receiver<RoomMessage>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    cancel_token: CancellationToken,
    snapshot_tx: watch::Sender<RoomSnapshot>,

    phase: RoomPhase,
    /// Generation of the current join attempt.
    attempt: u64,
    session: Option<LiveSession>,
    pending_join: Option<oneshot::Sender<Result<JoinedRoom, RoomError>>>,
    roster: Roster,
    chat: MessageLog,
    prefs: MediaPrefs,
    error: Option<RoomError>,
    error_deadline: Option<Instant>,
}

impl RoomActor {
    /// Spawn a new room actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: Config,
        broker: Arc<dyn AdmissionBroker>,
        factory: Arc<dyn RtcSessionFactory>,
        cancel_token: CancellationToken,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let actor = Self {
            config,
            broker,
            factory,
            receiver,
            completion_tx,
            completion_rx,
            cancel_token: cancel_token.clone(),
            snapshot_tx: watch::Sender::new(RoomSnapshot::default()),
            phase: RoomPhase::Idle,
            attempt: 0,
            session: None,
            pending_join: None,
            roster: Roster::new(),
            chat: MessageLog::new(),
            prefs: MediaPrefs {
                audio: true,
                video: true,
            },
            error: None,
            error_deadline: None,
        };
        actor.snapshot_tx.send_replace(actor.build_snapshot());
        let snapshots = actor.snapshot_tx.subscribe();

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomHandle {
            sender,
            cancel_token,
            snapshots,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "room.actor")]
    async fn run(mut self) {
        info!(target: "room.actor", "RoomActor started");

        loop {
            let reading_events = self.phase == RoomPhase::Active;

            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    info!(target: "room.actor", "RoomActor received cancellation signal");
                    self.shutdown().await;
                    break;
                }

                () = wait_until(self.error_deadline) => {
                    self.on_error_window_elapsed();
                }

                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion).await;
                }

                event = next_event(&mut self.session), if reading_events => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            self.enter_errored(RoomError::SessionTerminated(
                                "event stream closed".to_string(),
                            ))
                            .await;
                        }
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!(target: "room.actor", "RoomActor channel closed, exiting");
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(target: "room.actor", "RoomActor stopped");
    }

    /// Handle a single command.
    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                session_id,
                display_name,
                respond_to,
            } => self.handle_join(&session_id, &display_name, respond_to),

            RoomMessage::Leave { respond_to } => {
                let result = self.handle_leave().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::ToggleAudio { respond_to } => {
                self.handle_toggle(MediaKind::Audio, respond_to);
            }

            RoomMessage::ToggleVideo { respond_to } => {
                self.handle_toggle(MediaKind::Video, respond_to);
            }

            RoomMessage::SendChat { text, respond_to } => self.handle_send_chat(&text, respond_to),

            RoomMessage::SetChatOpen { open, respond_to } => {
                self.chat.set_open(open);
                self.publish_snapshot();
                let _ = respond_to.send(());
            }

            RoomMessage::ProbeBroker { respond_to } => {
                let broker = Arc::clone(&self.broker);
                tokio::spawn(async move {
                    let reachable = match broker.test_connection().await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(target: "room.actor", error = %e, "Broker probe failed");
                            false
                        }
                    };
                    let _ = respond_to.send(reachable);
                });
            }
        }
    }

    fn handle_join(
        &mut self,
        session_id: &str,
        display_name: &str,
        respond_to: oneshot::Sender<Result<JoinedRoom, RoomError>>,
    ) {
        if self.phase != RoomPhase::Idle {
            let _ = respond_to.send(Err(RoomError::InvalidState {
                state: self.phase,
                operation: "join",
            }));
            return;
        }

        let session_id = session_id.trim();
        let display_name = display_name.trim();
        if let Err(e) = validate_join_input(session_id, display_name) {
            let _ = respond_to.send(Err(e));
            return;
        }

        self.attempt += 1;
        let session_id = SessionId::new(session_id);
        let adapter = Arc::new(SessionAdapter::new(self.factory.as_ref()));
        let events = adapter.subscribe(&EventKind::ALL);

        info!(
            target: "room.actor",
            session_id = %session_id,
            attempt = self.attempt,
            "Joining room"
        );

        self.session = Some(LiveSession {
            session_id: session_id.clone(),
            display_name: display_name.to_string(),
            adapter: Arc::clone(&adapter),
            events,
            connection_id: None,
        });
        self.pending_join = Some(respond_to);
        self.transition(RoomPhase::Connecting);
        self.publish_snapshot();

        let attempt = self.attempt;
        let broker = Arc::clone(&self.broker);
        let settings = PublishSettings::from_config(&self.config, self.prefs.audio, self.prefs.video);
        let display_name = display_name.to_string();
        let completions = self.completion_tx.clone();

        tokio::spawn(async move {
            let result = establish(broker, adapter, session_id, display_name, settings).await;
            let _ = completions.send(Completion::Join { attempt, result });
        });
    }

    async fn handle_leave(&mut self) -> Result<(), RoomError> {
        match self.phase {
            RoomPhase::Connecting => {
                info!(target: "room.actor", attempt = self.attempt, "Cancelling join attempt");
                // Invalidate the in-flight attempt.
                self.attempt += 1;
                if let Some(pending) = self.pending_join.take() {
                    let _ = pending.send(Err(RoomError::JoinCancelled));
                }
                metrics::record_join_attempt("cancelled");
                self.teardown().await;
                self.transition(RoomPhase::Idle);
                self.publish_snapshot();
                Ok(())
            }
            RoomPhase::Active => {
                info!(target: "room.actor", "Leaving room");
                self.transition(RoomPhase::Leaving);
                self.publish_snapshot();
                self.teardown().await;
                self.transition(RoomPhase::Idle);
                self.publish_snapshot();
                Ok(())
            }
            RoomPhase::Errored => {
                debug!(target: "room.actor", "Error dismissed");
                self.error = None;
                self.error_deadline = None;
                self.transition(RoomPhase::Idle);
                self.publish_snapshot();
                Ok(())
            }
            RoomPhase::Idle | RoomPhase::Leaving => Err(RoomError::InvalidState {
                state: self.phase,
                operation: "leave",
            }),
        }
    }

    /// Flip a local track. The preference and roster change at once; the
    /// transport call completes off the loop and a failure reverts it.
    fn handle_toggle(
        &mut self,
        kind: MediaKind,
        respond_to: oneshot::Sender<Result<bool, RoomError>>,
    ) {
        let adapter = match (&self.session, self.phase) {
            (Some(session), RoomPhase::Active) => Arc::clone(&session.adapter),
            _ => {
                let _ = respond_to.send(Err(RoomError::InvalidState {
                    state: self.phase,
                    operation: toggle_operation(kind),
                }));
                return;
            }
        };

        let enabled = !self.prefs.get(kind);
        self.apply_local_media(kind, enabled);

        let attempt = self.attempt;
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = match kind {
                MediaKind::Audio => adapter.set_local_audio(enabled).await,
                MediaKind::Video => adapter.set_local_video(enabled).await,
            };
            let _ = completions.send(Completion::Toggled {
                attempt,
                kind,
                enabled,
                result,
                respond_to,
            });
        });
    }

    fn apply_local_media(&mut self, kind: MediaKind, enabled: bool) {
        self.prefs.set(kind, enabled);
        self.roster.update_local_media(kind, enabled);
        self.publish_snapshot();
        debug!(target: "room.actor", ?kind, enabled, "Local media toggled");
    }

    fn handle_send_chat(
        &mut self,
        text: &str,
        respond_to: oneshot::Sender<Result<ChatMessage, RoomError>>,
    ) {
        let session = match (&self.session, self.phase) {
            (Some(session), RoomPhase::Active) => session,
            _ => {
                let _ = respond_to.send(Err(RoomError::InvalidMessage(
                    InvalidMessageReason::NoSession,
                )));
                return;
            }
        };

        let text = match wire::validate_text(text, self.config.chat_max_message_length) {
            Ok(text) => text,
            Err(reason) => {
                let _ = respond_to.send(Err(RoomError::InvalidMessage(reason)));
                return;
            }
        };

        if session.display_name.is_empty() {
            let _ = respond_to.send(Err(RoomError::InvalidMessage(
                InvalidMessageReason::NoSender,
            )));
            return;
        }

        let payload = ChatPayload {
            text,
            sender: session.display_name.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let signal = wire::encode(&payload);
        let adapter = Arc::clone(&session.adapter);
        let attempt = self.attempt;
        let completions = self.completion_tx.clone();

        tokio::spawn(async move {
            let result = adapter.send_signal(signal).await;
            let _ = completions.send(Completion::ChatSent {
                attempt,
                payload,
                result,
                respond_to,
            });
        });
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Join { attempt, result } => {
                if attempt != self.attempt || self.phase != RoomPhase::Connecting {
                    debug!(
                        target: "room.actor",
                        attempt,
                        current = self.attempt,
                        "Discarding stale join completion"
                    );
                    return;
                }

                let error = match result {
                    Ok(connection_id) => {
                        self.on_join_succeeded(connection_id);
                        return;
                    }
                    Err(e) => e,
                };

                warn!(target: "room.actor", error = %error, "Join failed");
                metrics::record_join_attempt(error.kind());
                if let Some(pending) = self.pending_join.take() {
                    let _ = pending.send(Err(error.clone()));
                }

                if error.is_lifecycle() {
                    self.enter_errored(error).await;
                } else {
                    // Returned to the caller only; no error screen.
                    self.teardown().await;
                    self.transition(RoomPhase::Idle);
                    self.publish_snapshot();
                }
            }

            Completion::Toggled {
                attempt,
                kind,
                enabled,
                result,
                respond_to,
            } => {
                let response = match result {
                    Ok(()) => Ok(enabled),
                    Err(e) => {
                        warn!(target: "room.actor", ?kind, error = %e, "Local media toggle failed");
                        // Revert unless a later toggle already moved it on.
                        if attempt == self.attempt && self.prefs.get(kind) == enabled {
                            self.apply_local_media(kind, !enabled);
                        }
                        Err(e)
                    }
                };
                let _ = respond_to.send(response);
            }

            Completion::ChatSent {
                attempt,
                payload,
                result,
                respond_to,
            } => {
                let current = attempt == self.attempt && self.phase == RoomPhase::Active;
                let response = match result {
                    Ok(()) if current => {
                        let message = self.chat.append_local(payload);
                        metrics::record_chat_message("outbound");
                        self.publish_snapshot();
                        Ok(message)
                    }
                    Ok(()) => Err(RoomError::SignalDelivery(
                        "session ended before the send completed".to_string(),
                    )),
                    Err(e) => {
                        warn!(target: "room.actor", error = %e, "Chat send failed");
                        Err(e)
                    }
                };
                let _ = respond_to.send(response);
            }
        }
    }

    fn on_join_succeeded(&mut self, connection_id: ConnectionId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.connection_id = Some(connection_id.clone());

        let joined = JoinedRoom {
            session_id: session.session_id.clone(),
            connection_id,
            display_name: session.display_name.clone(),
        };

        self.roster.set_local(LocalParticipant {
            display_name: joined.display_name.clone(),
            audio_enabled: self.prefs.audio,
            video_enabled: self.prefs.video,
        });

        info!(
            target: "room.actor",
            session_id = %joined.session_id,
            connection_id = %joined.connection_id,
            "Room active"
        );
        metrics::record_join_attempt("success");
        self.transition(RoomPhase::Active);
        self.publish_snapshot();

        if let Some(pending) = self.pending_join.take() {
            let _ = pending.send(Ok(joined));
        }
    }

    /// Apply one transport event. Only called while active.
    async fn handle_event(&mut self, event: RtcEvent) {
        match event {
            RtcEvent::StreamAdded(stream) => match self.roster.on_stream_added(stream) {
                RosterChange::Joined(participant) => {
                    debug!(target: "room.actor", stream_id = %participant.stream_id, "Participant joined");
                    self.append_notice(presence::joined(
                        self.config.locale,
                        &participant.display_name,
                    ));
                }
                RosterChange::Replaced(participant) => {
                    debug!(target: "room.actor", stream_id = %participant.stream_id, "Stream re-announced");
                }
            },

            RtcEvent::StreamRemoved { stream_id, reason } => {
                if let Some(participant) = self.roster.on_stream_removed(&stream_id) {
                    debug!(target: "room.actor", stream_id = %stream_id, reason = %reason, "Participant left");
                    self.append_notice(presence::left(self.config.locale, &participant.display_name));
                }
            }

            RtcEvent::StreamPropertyChanged {
                stream_id,
                kind,
                enabled,
            } => {
                self.roster.on_property_changed(&stream_id, kind, enabled);
            }

            RtcEvent::SignalReceived(signal) => self.handle_signal(&signal),

            RtcEvent::SessionTerminated { reason } => {
                warn!(target: "room.actor", reason = %reason, "Session terminated by transport");
                self.enter_errored(RoomError::SessionTerminated(reason)).await;
                return;
            }

            RtcEvent::Exception { detail } => {
                warn!(target: "room.actor", detail = %detail, "Transport exception");
                self.enter_errored(RoomError::SessionException(detail)).await;
                return;
            }
        }

        self.publish_snapshot();
    }

    fn handle_signal(&mut self, signal: &InboundSignal) {
        if !wire::is_chat_signal(&signal.signal_type) {
            debug!(target: "room.chat", signal_type = %signal.signal_type, "Ignoring non-chat signal");
            return;
        }

        // Unattributed chat cannot be told apart from our own echo.
        let Some(from) = signal.from.as_ref() else {
            debug!(target: "room.chat", "Dropping chat signal without a sender connection");
            return;
        };
        let own_connection = self
            .session
            .as_ref()
            .and_then(|s| s.connection_id.as_ref());
        if Some(from) == own_connection {
            return;
        }

        match wire::decode(signal, self.config.chat_max_message_length) {
            Ok(payload) => {
                self.chat.append_inbound(payload);
                metrics::record_chat_message("inbound");
            }
            Err(e) => {
                warn!(target: "room.chat", error = %e, "Dropping inbound chat signal");
                metrics::record_chat_decode_failure();
            }
        }
    }

    fn append_notice(&mut self, text: String) {
        self.chat
            .append_system(text, chrono::Utc::now().timestamp_millis());
        metrics::record_chat_message("system");
    }

    /// Tear down and show the error until the display window elapses.
    async fn enter_errored(&mut self, error: RoomError) {
        self.teardown().await;
        self.error_deadline = Some(Instant::now() + self.config.error_display_window());
        self.error = Some(error);
        self.transition(RoomPhase::Errored);
        self.publish_snapshot();
    }

    fn on_error_window_elapsed(&mut self) {
        self.error_deadline = None;
        if self.phase != RoomPhase::Errored {
            return;
        }
        debug!(target: "room.actor", "Error window elapsed");
        self.error = None;
        self.transition(RoomPhase::Idle);
        self.publish_snapshot();
    }

    /// Disconnect the live session and clear derived state.
    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.events.cancel();
            session.adapter.disconnect().await;
        }
        self.roster.clear();
        self.chat.clear();
        self.chat.set_open(false);
    }

    async fn shutdown(&mut self) {
        self.attempt += 1;
        if let Some(pending) = self.pending_join.take() {
            let _ = pending.send(Err(RoomError::JoinCancelled));
        }
        self.teardown().await;
        self.error = None;
        self.error_deadline = None;
        self.transition(RoomPhase::Idle);
        self.publish_snapshot();
    }

    fn transition(&mut self, to: RoomPhase) {
        if self.phase == to {
            return;
        }
        debug!(target: "room.actor", from = %self.phase, to = %to, "Phase transition");
        self.phase = to;
        metrics::record_state_transition(to.as_str());
    }

    fn build_snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            phase: self.phase,
            session_id: self.session.as_ref().map(|s| s.session_id.clone()),
            local_connection_id: self.session.as_ref().and_then(|s| s.connection_id.clone()),
            participants: self.roster.entries(),
            grid: self.roster.grid(),
            messages: self.chat.messages().to_vec(),
            unread: self.chat.unread(),
            chat_open: self.chat.is_open(),
            audio_enabled: self.prefs.audio,
            video_enabled: self.prefs.video,
            error: self.error.as_ref().map(RoomError::user_message),
        }
    }

    fn publish_snapshot(&self) {
        metrics::set_participants_active(self.roster.count());
        self.snapshot_tx.send_replace(self.build_snapshot());
    }
}

/// Broker admission, transport connect, local publish.
async fn establish(
    broker: Arc<dyn AdmissionBroker>,
    adapter: Arc<SessionAdapter>,
    session_id: SessionId,
    display_name: String,
    settings: PublishSettings,
) -> Result<ConnectionId, RoomError> {
    let token = broker.request_admission(&session_id).await?;
    let connection_id = adapter.connect(&token, &display_name).await?;
    adapter.publish_local(&settings).await?;
    Ok(connection_id)
}

fn toggle_operation(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "toggle audio",
        MediaKind::Video => "toggle video",
    }
}

fn validate_join_input(session_id: &str, display_name: &str) -> Result<(), RoomError> {
    if session_id.chars().count() < MIN_SESSION_ID_LEN {
        return Err(RoomError::InvalidInput(format!(
            "room id must be at least {MIN_SESSION_ID_LEN} characters"
        )));
    }
    if display_name.chars().count() < MIN_DISPLAY_NAME_LEN {
        return Err(RoomError::InvalidInput(format!(
            "display name must be at least {MIN_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_event(session: &mut Option<LiveSession>) -> Option<RtcEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}
