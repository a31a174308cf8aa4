//! Pre-configured test data for room client tests.
//!
//! Provides:
//! - configuration pointing at a test broker
//! - remote streams with well-formed connection metadata
//! - chat payloads as they appear on the wire

use common::types::{ConnectionId, StreamId};
use room_client::config::Config;
use room_client::rtc::RemoteStream;
use std::collections::HashMap;

/// Broker secret used by [`test_config`].
pub const TEST_BROKER_SECRET: &str = "MY_SECRET";

/// Base variables for a test configuration.
#[must_use]
pub fn test_vars(broker_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("BROKER_URL".to_string(), broker_url.to_string()),
        ("BROKER_SECRET".to_string(), TEST_BROKER_SECRET.to_string()),
    ])
}

/// Configuration with defaults for everything but the broker location.
pub fn test_config(broker_url: &str) -> Config {
    Config::from_vars(&test_vars(broker_url)).expect("test config should be valid")
}

/// Configuration with extra variables layered over [`test_vars`].
pub fn test_config_with(broker_url: &str, overrides: &[(&str, &str)]) -> Config {
    let mut vars = test_vars(broker_url);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars).expect("test config should be valid")
}

/// Connection metadata a peer named `display_name` would publish.
#[must_use]
pub fn connection_data(display_name: &str) -> String {
    serde_json::json!({ "clientData": display_name }).to_string()
}

/// A remote stream with audio and video on.
#[must_use]
pub fn remote_stream(stream_id: &str, display_name: &str) -> RemoteStream {
    RemoteStream {
        stream_id: StreamId::new(stream_id),
        connection_id: remote_connection_id(stream_id),
        connection_data: connection_data(display_name),
        audio_active: true,
        video_active: true,
    }
}

/// Connection id [`remote_stream`] assigns to `stream_id`.
#[must_use]
pub fn remote_connection_id(stream_id: &str) -> ConnectionId {
    ConnectionId::new(format!("con_{stream_id}"))
}

/// Chat payload JSON as sent by another client.
#[must_use]
pub fn chat_data(sender: &str, text: &str, timestamp: i64) -> String {
    serde_json::json!({
        "text": text,
        "sender": sender,
        "timestamp": timestamp,
    })
    .to_string()
}
