//! Chat overlay integration tests.
//!
//! Covers sending, receiving, unread tracking and presence notices through
//! the running room actor.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use room_client::chat::CHAT_SIGNAL_TYPE;
use room_client::errors::{InvalidMessageReason, RoomError};
use room_client::rtc::{InboundSignal, RtcEvent};
use room_test_utils::{
    chat_data, remote_connection_id, test_config, test_config_with, MockBroker, MockRtcBehavior,
    MockRtcFactory, TestRoom,
};

async fn joined_room() -> TestRoom {
    let room = TestRoom::spawn();
    room.handle.join("room-42", "Alice").await.unwrap();
    room
}

fn texts(room: &TestRoom) -> Vec<String> {
    room.handle
        .snapshot()
        .messages
        .iter()
        .map(|m| m.text.clone())
        .collect()
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_send_broadcasts_one_signal_and_logs_once() {
    let room = joined_room().await;

    let message = room.handle.send_chat("hi").await.unwrap();
    assert_eq!(message.text, "hi");
    assert_eq!(message.sender, "Alice");
    assert!(!message.is_system);

    let sent = room.session().sent_signals();
    assert_eq!(sent.len(), 1);
    let signal = sent.first().unwrap();
    assert_eq!(signal.signal_type, CHAT_SIGNAL_TYPE);
    assert!(signal.to.is_empty());

    let payload: serde_json::Value = serde_json::from_str(&signal.data).unwrap();
    assert_eq!(
        payload,
        serde_json::json!({
            "text": "hi",
            "sender": "Alice",
            "timestamp": message.timestamp,
        })
    );

    let snapshot = room.handle.snapshot();
    assert_eq!(snapshot.messages, vec![message]);
    assert_eq!(snapshot.unread, 0);

    room.shutdown().await;
}

#[tokio::test]
async fn test_text_is_trimmed_before_sending() {
    let room = joined_room().await;

    let message = room.handle.send_chat("  hello there \n").await.unwrap();
    assert_eq!(message.text, "hello there");

    room.shutdown().await;
}

#[tokio::test]
async fn test_invalid_text_never_reaches_transport() {
    let room = joined_room().await;

    assert_eq!(
        room.handle.send_chat("   ").await.unwrap_err(),
        RoomError::InvalidMessage(InvalidMessageReason::EmptyText)
    );
    assert_eq!(
        room.handle.send_chat("x".repeat(501)).await.unwrap_err(),
        RoomError::InvalidMessage(InvalidMessageReason::TooLong { len: 501, max: 500 })
    );

    assert!(room.session().sent_signals().is_empty());
    assert!(room.handle.snapshot().messages.is_empty());

    room.shutdown().await;
}

#[tokio::test]
async fn test_send_without_session() {
    let room = TestRoom::spawn();

    assert_eq!(
        room.handle.send_chat("hi").await.unwrap_err(),
        RoomError::InvalidMessage(InvalidMessageReason::NoSession)
    );

    room.shutdown().await;
}

#[tokio::test]
async fn test_rejected_signal_is_not_logged() {
    let room = TestRoom::spawn_with(
        test_config("http://broker.test"),
        MockBroker::accepting(),
        MockRtcFactory::with_behavior(MockRtcBehavior {
            fail_signal: true,
            ..Default::default()
        }),
    );
    room.handle.join("room-42", "Alice").await.unwrap();

    let err = room.handle.send_chat("hi").await.unwrap_err();
    assert!(matches!(err, RoomError::SignalDelivery(_)));
    assert!(room.handle.snapshot().messages.is_empty());

    room.shutdown().await;
}

#[tokio::test]
async fn test_own_echo_is_not_logged_twice() {
    let room = TestRoom::spawn_with(
        test_config("http://broker.test"),
        MockBroker::accepting(),
        MockRtcFactory::with_behavior(MockRtcBehavior {
            echo_signals: true,
            ..Default::default()
        }),
    );
    room.handle.join("room-42", "Alice").await.unwrap();
    let session = room.session();

    room.handle.send_chat("hi").await.unwrap();

    // Events are applied in order; once Bob's message shows, the echo was seen.
    let bob = remote_connection_id("str_bob");
    session.signal_from(&bob, "chat", &chat_data("Bob", "hey", 2));
    room.wait_for(|s| s.messages.iter().any(|m| m.sender == "Bob"))
        .await;

    assert_eq!(texts(&room), vec!["hi", "hey"]);

    room.shutdown().await;
}

#[tokio::test]
async fn test_unattributed_chat_is_dropped() {
    let room = joined_room().await;
    let session = room.session();

    room.handle.send_chat("hi").await.unwrap();
    session.emit(RtcEvent::SignalReceived(InboundSignal {
        signal_type: "chat".to_string(),
        data: chat_data("Alice", "hi", 1),
        from: None,
    }));

    let bob = remote_connection_id("str_bob");
    session.signal_from(&bob, "chat", &chat_data("Bob", "hey", 2));
    let snapshot = room.wait_for(|s| s.messages.iter().any(|m| m.sender == "Bob")).await;

    assert_eq!(texts(&room), vec!["hi", "hey"]);
    assert_eq!(snapshot.unread, 1);

    room.shutdown().await;
}

// ============================================================================
// Receiving
// ============================================================================

#[tokio::test]
async fn test_unread_counts_until_opened() {
    let room = joined_room().await;
    let session = room.session();
    let bob = remote_connection_id("str_bob");

    for i in 0..3 {
        session.signal_from(&bob, "chat", &chat_data("Bob", &format!("msg {i}"), i));
    }
    let snapshot = room.wait_for(|s| s.unread == 3).await;
    assert_eq!(snapshot.messages.len(), 3);
    assert!(!snapshot.chat_open);

    room.handle.set_chat_open(true).await.unwrap();
    let snapshot = room.handle.snapshot();
    assert_eq!(snapshot.unread, 0);
    assert!(snapshot.chat_open);

    session.signal_from(&bob, "chat", &chat_data("Bob", "while open", 9));
    let snapshot = room.wait_for(|s| s.messages.len() == 4).await;
    assert_eq!(snapshot.unread, 0);

    room.handle.set_chat_open(false).await.unwrap();
    session.signal_from(&bob, "chat", &chat_data("Bob", "closed again", 10));
    let snapshot = room.wait_for(|s| s.messages.len() == 5).await;
    assert_eq!(snapshot.unread, 1);

    room.shutdown().await;
}

#[tokio::test]
async fn test_undecodable_and_foreign_signals_are_dropped() {
    let room = joined_room().await;
    let session = room.session();
    let bob = remote_connection_id("str_bob");

    session.signal_from(&bob, "chat", "not json");
    session.signal_from(&bob, "chat", r#"{"text":"no sender","timestamp":1}"#);
    session.signal_from(&bob, "chat", &chat_data("Bob", "   ", 1));
    session.signal_from(&bob, "reaction", &chat_data("Bob", "👍", 1));
    session.signal_from(&bob, "signal:chat", &chat_data("Bob", "prefixed", 2));
    session.signal_from(&bob, "chat", &chat_data("Bob", "plain", 3));

    room.wait_for(|s| s.messages.len() == 2).await;
    assert_eq!(texts(&room), vec!["prefixed", "plain"]);
    assert_eq!(room.handle.snapshot().unread, 2);

    room.shutdown().await;
}

#[tokio::test]
async fn test_inbound_keeps_arrival_order() {
    let room = joined_room().await;
    let session = room.session();
    let bob = remote_connection_id("str_bob");

    session.signal_from(&bob, "chat", &chat_data("Bob", "late clock", 9_000));
    session.signal_from(&bob, "chat", &chat_data("Bob", "early clock", 1_000));

    room.wait_for(|s| s.messages.len() == 2).await;
    assert_eq!(texts(&room), vec!["late clock", "early clock"]);

    room.shutdown().await;
}

// ============================================================================
// Presence notices and teardown
// ============================================================================

#[tokio::test]
async fn test_presence_notices_are_localized() {
    let room = TestRoom::spawn_with(
        test_config_with("http://broker.test", &[("ROOM_LOCALE", "ko-KR")]),
        MockBroker::accepting(),
        MockRtcFactory::new(),
    );
    room.handle.join("room-42", "Alice").await.unwrap();
    let session = room.session();

    session.add_remote("str_bob", "민수");
    session.remove_remote("str_bob");

    let snapshot = room.wait_for(|s| s.messages.len() == 2).await;
    assert_eq!(
        texts(&room),
        vec!["민수님이 입장하셨습니다.", "민수님이 퇴장하셨습니다."]
    );
    assert!(snapshot.messages.iter().all(|m| m.is_system));
    assert!(snapshot.messages.iter().all(|m| m.sender == "system"));
    assert_eq!(snapshot.unread, 0);

    room.shutdown().await;
}

#[tokio::test]
async fn test_leave_clears_chat_state() {
    let room = joined_room().await;
    let session = room.session();
    let bob = remote_connection_id("str_bob");

    room.handle.set_chat_open(true).await.unwrap();
    session.signal_from(&bob, "chat", &chat_data("Bob", "hey", 1));
    room.wait_for(|s| s.messages.len() == 1).await;

    room.handle.leave().await.unwrap();
    let snapshot = room.handle.snapshot();
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.unread, 0);
    assert!(!snapshot.chat_open);

    // Nothing from the old session survives into the next one.
    room.handle.join("room-42", "Alice").await.unwrap();
    assert!(room.handle.snapshot().messages.is_empty());

    room.shutdown().await;
}
