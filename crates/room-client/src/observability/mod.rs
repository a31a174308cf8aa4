//! Observability for the room client.
//!
//! Metric labels are bounded:
//! - `outcome`: success, cancelled, or a `RoomError::kind()` label
//! - `to`: the five room phases
//! - `direction`: inbound, outbound, system
//! - `operation`: the four broker calls
//! - `status`: success, conflict, client_error, server_error, unreachable, unexpected
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `room_join_attempts_total` | Counter | `outcome` |
//! | `room_state_transitions_total` | Counter | `to` |
//! | `room_participants_active` | Gauge | none |
//! | `room_chat_messages_total` | Counter | `direction` |
//! | `room_chat_decode_failures_total` | Counter | none |
//! | `room_broker_requests_total` | Counter | `operation`, `status` |
//!
//! The library records through the `metrics` facade only; installing an
//! exporter is left to the embedding application.

pub mod metrics;
