//! Metric definitions for the room client.
//!
//! All metrics follow Prometheus naming conventions:
//! - `room_` prefix
//! - `_total` suffix for counters

use metrics::{counter, gauge};

// ============================================================================
// Lifecycle
// ============================================================================

/// Record the outcome of one join attempt.
///
/// Metric: `room_join_attempts_total`
/// Labels: `outcome` (success, cancelled, or a `RoomError::kind()` label)
pub fn record_join_attempt(outcome: &'static str) {
    counter!("room_join_attempts_total", "outcome" => outcome).increment(1);
}

/// Record a room phase transition.
///
/// Metric: `room_state_transitions_total`
/// Labels: `to` (idle, connecting, active, leaving, errored)
pub fn record_state_transition(to: &'static str) {
    counter!("room_state_transitions_total", "to" => to).increment(1);
}

/// Set the number of participants currently on the roster, local included.
///
/// Metric: `room_participants_active`
pub fn set_participants_active(count: usize) {
    // usize to f64 conversion is safe for realistic room sizes
    #[allow(clippy::cast_precision_loss)]
    gauge!("room_participants_active").set(count as f64);
}

// ============================================================================
// Chat
// ============================================================================

/// Record one chat message appended to the log.
///
/// Metric: `room_chat_messages_total`
/// Labels: `direction` (inbound, outbound, system)
pub fn record_chat_message(direction: &'static str) {
    counter!("room_chat_messages_total", "direction" => direction).increment(1);
}

/// Record an inbound chat signal dropped because it did not decode.
///
/// Metric: `room_chat_decode_failures_total`
pub fn record_chat_decode_failure() {
    counter!("room_chat_decode_failures_total").increment(1);
}

// ============================================================================
// Broker
// ============================================================================

/// Record one broker HTTP request.
///
/// Metric: `room_broker_requests_total`
/// Labels: `operation`, `status`
///
/// Cardinality: 4 operations x 6 statuses
pub fn record_broker_request(operation: &'static str, status: &'static str) {
    counter!(
        "room_broker_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    type Entry = (String, Vec<(String, String)>, DebugValue);

    fn collect(recorder_snapshot: metrics_util::debugging::Snapshotter) -> Vec<Entry> {
        recorder_snapshot
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| {
                let key = key.key();
                let labels = key
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                (key.name().to_string(), labels, value)
            })
            .collect()
    }

    fn counter_value(entries: &[Entry], name: &str, label: Option<(&str, &str)>) -> Option<u64> {
        entries.iter().find_map(|(metric, labels, value)| {
            if metric != name {
                return None;
            }
            if let Some((label_key, label_value)) = label {
                if !labels
                    .iter()
                    .any(|(k, v)| k == label_key && v == label_value)
                {
                    return None;
                }
            }
            match value {
                DebugValue::Counter(v) => Some(*v),
                _ => None,
            }
        })
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_join_attempt("success");
        record_state_transition("active");
        set_participants_active(3);
        record_chat_message("inbound");
        record_chat_decode_failure();
        record_broker_request("create_token", "server_error");
    }

    #[test]
    fn test_counters_are_labelled() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_join_attempt("success");
            record_join_attempt("token");
            record_join_attempt("token");
            record_state_transition("errored");
            record_chat_message("outbound");
            record_chat_decode_failure();
            record_broker_request("create_session", "conflict");
        });

        let entries = collect(snapshotter);

        assert_eq!(
            counter_value(&entries, "room_join_attempts_total", Some(("outcome", "token"))),
            Some(2)
        );
        assert_eq!(
            counter_value(&entries, "room_join_attempts_total", Some(("outcome", "success"))),
            Some(1)
        );
        assert_eq!(
            counter_value(&entries, "room_state_transitions_total", Some(("to", "errored"))),
            Some(1)
        );
        assert_eq!(
            counter_value(
                &entries,
                "room_chat_messages_total",
                Some(("direction", "outbound"))
            ),
            Some(1)
        );
        assert_eq!(
            counter_value(&entries, "room_chat_decode_failures_total", None),
            Some(1)
        );
        assert_eq!(
            counter_value(
                &entries,
                "room_broker_requests_total",
                Some(("status", "conflict"))
            ),
            Some(1)
        );
    }

    #[test]
    fn test_participants_gauge() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || set_participants_active(4));

        let entries = collect(snapshotter);
        let gauge = entries
            .into_iter()
            .find(|(metric, _, _)| metric == "room_participants_active")
            .map(|(_, _, value)| value)
            .expect("gauge recorded");

        assert!(matches!(gauge, DebugValue::Gauge(v) if (v.into_inner() - 4.0).abs() < f64::EPSILON));
    }
}
