//! Participant roster.
//!
//! A pure reducer over transport stream events. Remote membership is a
//! function of the observed add/remove sequence only: removing an unknown
//! stream is a no-op and a repeated add for the same stream id replaces the
//! entry in place.

use crate::rtc::events::{MediaKind, RemoteStream};
use common::types::{ConnectionId, StreamId};
use serde::{Deserialize, Serialize};

/// Display name used when connection metadata carries none.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown User";

/// Separator between client and server metadata in connection data.
const SERVER_DATA_SEPARATOR: &str = "%/%";

#[derive(Debug, Deserialize)]
struct ClientData {
    #[serde(rename = "clientData")]
    client_data: Option<String>,
}

/// Extract the display name from raw connection metadata.
///
/// Expects `{"clientData": "<name>"}`, optionally followed by server data
/// after `%/%`. Anything else yields [`UNKNOWN_DISPLAY_NAME`].
#[must_use]
pub fn parse_display_name(connection_data: &str) -> String {
    let client_part = connection_data
        .split(SERVER_DATA_SEPARATOR)
        .next()
        .unwrap_or_default();

    serde_json::from_str::<ClientData>(client_part)
        .ok()
        .and_then(|data| data.client_data)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
}

/// The user of this client, present only while the session is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalParticipant {
    pub display_name: String,
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

/// A remote participant, keyed by its stream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub stream_id: StreamId,
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub audio_active: bool,
    pub video_active: bool,
}

impl From<RemoteStream> for RemoteParticipant {
    fn from(stream: RemoteStream) -> Self {
        Self {
            display_name: parse_display_name(&stream.connection_data),
            stream_id: stream.stream_id,
            connection_id: stream.connection_id,
            audio_active: stream.audio_active,
            video_active: stream.video_active,
        }
    }
}

/// Result of applying a stream-added event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// A new participant joined.
    Joined(RemoteParticipant),
    /// An existing stream id was re-announced and replaced in place.
    Replaced(RemoteParticipant),
}

/// One tile in the ordered participant view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    /// Stream id for remotes; `None` for the local participant.
    pub stream_id: Option<StreamId>,
    pub display_name: String,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub is_local: bool,
}

/// Tile grid dimensions for a participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
}

impl GridLayout {
    /// Layout for `count` tiles.
    #[must_use]
    pub fn for_count(count: usize) -> Self {
        let columns = match count {
            0 | 1 => 1,
            2..=4 => 2,
            5 | 6 => 3,
            _ => 4,
        };
        let rows = count.div_ceil(columns).max(1);
        Self { columns, rows }
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::for_count(0)
    }
}

/// Local participant plus remotes in arrival order.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    local: Option<LocalParticipant>,
    remotes: Vec<RemoteParticipant>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a stream-added event.
    pub fn on_stream_added(&mut self, stream: RemoteStream) -> RosterChange {
        let participant = RemoteParticipant::from(stream);

        if let Some(existing) = self
            .remotes
            .iter_mut()
            .find(|p| p.stream_id == participant.stream_id)
        {
            *existing = participant.clone();
            return RosterChange::Replaced(participant);
        }

        self.remotes.push(participant.clone());
        RosterChange::Joined(participant)
    }

    /// Apply a stream-removed event. Returns the removed participant, if known.
    pub fn on_stream_removed(&mut self, stream_id: &StreamId) -> Option<RemoteParticipant> {
        let index = self.remotes.iter().position(|p| &p.stream_id == stream_id)?;
        Some(self.remotes.remove(index))
    }

    /// Apply a remote track mute/unmute. Returns `false` for unknown streams.
    pub fn on_property_changed(
        &mut self,
        stream_id: &StreamId,
        kind: MediaKind,
        enabled: bool,
    ) -> bool {
        let Some(participant) = self.remotes.iter_mut().find(|p| &p.stream_id == stream_id) else {
            return false;
        };
        match kind {
            MediaKind::Audio => participant.audio_active = enabled,
            MediaKind::Video => participant.video_active = enabled,
        }
        true
    }

    pub fn set_local(&mut self, local: LocalParticipant) {
        self.local = Some(local);
    }

    /// Update the local participant's media flags. Returns `false` if there is
    /// no local participant.
    pub fn update_local_media(&mut self, kind: MediaKind, enabled: bool) -> bool {
        let Some(local) = self.local.as_mut() else {
            return false;
        };
        match kind {
            MediaKind::Audio => local.audio_enabled = enabled,
            MediaKind::Video => local.video_enabled = enabled,
        }
        true
    }

    /// Drop everyone, local included.
    pub fn clear(&mut self) {
        self.local = None;
        self.remotes.clear();
    }

    /// Ordered view: local first, then remotes in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<RosterEntry> {
        let local = self.local.iter().map(|local| RosterEntry {
            stream_id: None,
            display_name: local.display_name.clone(),
            audio_enabled: local.audio_enabled,
            video_enabled: local.video_enabled,
            is_local: true,
        });

        let remotes = self.remotes.iter().map(|remote| RosterEntry {
            stream_id: Some(remote.stream_id.clone()),
            display_name: remote.display_name.clone(),
            audio_enabled: remote.audio_active,
            video_enabled: remote.video_active,
            is_local: false,
        });

        local.chain(remotes).collect()
    }

    /// Participants including the local one.
    #[must_use]
    pub fn count(&self) -> usize {
        usize::from(self.local.is_some()) + self.remotes.len()
    }

    #[must_use]
    pub fn grid(&self) -> GridLayout {
        GridLayout::for_count(self.count())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn stream(id: &str, name: &str) -> RemoteStream {
        RemoteStream {
            stream_id: StreamId::new(id),
            connection_id: ConnectionId::new(format!("con_{id}")),
            connection_data: format!(r#"{{"clientData":"{name}"}}"#),
            audio_active: true,
            video_active: true,
        }
    }

    fn alice() -> LocalParticipant {
        LocalParticipant {
            display_name: "Alice".to_string(),
            audio_enabled: true,
            video_enabled: true,
        }
    }

    fn names(roster: &Roster) -> Vec<String> {
        roster
            .entries()
            .into_iter()
            .map(|e| e.display_name)
            .collect()
    }

    #[test]
    fn test_parse_display_name() {
        assert_eq!(parse_display_name(r#"{"clientData":"Bob"}"#), "Bob");
        assert_eq!(
            parse_display_name(r#"{"clientData":"Bob"}%/%{"serverData":"x"}"#),
            "Bob"
        );
        assert_eq!(parse_display_name(r#"{"clientData":"  Bob  "}"#), "Bob");
        assert_eq!(parse_display_name(""), UNKNOWN_DISPLAY_NAME);
        assert_eq!(parse_display_name("not json"), UNKNOWN_DISPLAY_NAME);
        assert_eq!(parse_display_name(r#"{"other":"x"}"#), UNKNOWN_DISPLAY_NAME);
        assert_eq!(parse_display_name(r#"{"clientData":""}"#), UNKNOWN_DISPLAY_NAME);
        assert_eq!(parse_display_name(r#"{"clientData":42}"#), UNKNOWN_DISPLAY_NAME);
    }

    #[test]
    fn test_local_first_then_arrival_order() {
        let mut roster = Roster::new();
        roster.on_stream_added(stream("s2", "Carol"));
        roster.set_local(alice());
        roster.on_stream_added(stream("s1", "Bob"));

        assert_eq!(names(&roster), vec!["Alice", "Carol", "Bob"]);
        let flags: Vec<(bool, Option<StreamId>)> = roster
            .entries()
            .into_iter()
            .map(|e| (e.is_local, e.stream_id))
            .collect();
        assert_eq!(
            flags,
            vec![
                (true, None),
                (false, Some(StreamId::new("s2"))),
                (false, Some(StreamId::new("s1"))),
            ]
        );
    }

    #[test]
    fn test_count_is_adds_minus_matching_removes() {
        let mut roster = Roster::new();
        for i in 0..5 {
            roster.on_stream_added(stream(&format!("s{i}"), "P"));
        }
        assert_eq!(roster.count(), 5);

        assert!(roster.on_stream_removed(&StreamId::new("s1")).is_some());
        assert!(roster.on_stream_removed(&StreamId::new("s3")).is_some());
        assert_eq!(roster.count(), 3);

        // Unknown and repeated removals are no-ops.
        assert!(roster.on_stream_removed(&StreamId::new("nope")).is_none());
        assert!(roster.on_stream_removed(&StreamId::new("s1")).is_none());
        assert_eq!(roster.count(), 3);
    }

    #[test]
    fn test_duplicate_add_replaces_in_place() {
        let mut roster = Roster::new();
        roster.on_stream_added(stream("s1", "Bob"));
        roster.on_stream_added(stream("s2", "Carol"));

        let change = roster.on_stream_added(RemoteStream {
            connection_data: "garbage".to_string(),
            ..stream("s1", "ignored")
        });

        assert!(matches!(change, RosterChange::Replaced(ref p) if p.display_name == UNKNOWN_DISPLAY_NAME));
        assert_eq!(roster.count(), 2);
        assert_eq!(names(&roster), vec![UNKNOWN_DISPLAY_NAME, "Carol"]);
    }

    #[test]
    fn test_property_changes() {
        let mut roster = Roster::new();
        roster.on_stream_added(stream("s1", "Bob"));

        assert!(roster.on_property_changed(&StreamId::new("s1"), MediaKind::Audio, false));
        assert!(!roster.on_property_changed(&StreamId::new("s9"), MediaKind::Audio, false));

        let bob = roster
            .entries()
            .into_iter()
            .find(|e| e.stream_id == Some(StreamId::new("s1")))
            .unwrap();
        assert!(!bob.audio_enabled);
        assert!(bob.video_enabled);
    }

    #[test]
    fn test_local_media_updates() {
        let mut roster = Roster::new();
        assert!(!roster.update_local_media(MediaKind::Video, false));

        roster.set_local(alice());
        assert!(roster.update_local_media(MediaKind::Video, false));
        let local = roster.entries().into_iter().find(|e| e.is_local).unwrap();
        assert!(!local.video_enabled);
        assert!(local.audio_enabled);
    }

    #[test]
    fn test_clear() {
        let mut roster = Roster::new();
        roster.set_local(alice());
        roster.on_stream_added(stream("s1", "Bob"));

        roster.clear();
        assert_eq!(roster.count(), 0);
        assert!(roster.entries().is_empty());
    }

    #[test]
    fn test_grid_arity() {
        let expected = [
            (0, 1, 1),
            (1, 1, 1),
            (2, 2, 1),
            (3, 2, 2),
            (4, 2, 2),
            (5, 3, 2),
            (6, 3, 2),
            (7, 4, 2),
            (9, 4, 3),
            (16, 4, 4),
        ];
        for (count, columns, rows) in expected {
            assert_eq!(
                GridLayout::for_count(count),
                GridLayout { columns, rows },
                "count {count}"
            );
        }
    }

    #[test]
    fn test_grid_follows_roster_count() {
        let mut roster = Roster::new();
        roster.set_local(alice());
        assert_eq!(roster.grid().columns, 1);

        roster.on_stream_added(stream("s1", "Bob"));
        assert_eq!(roster.grid().columns, 2);

        for i in 2..6 {
            roster.on_stream_added(stream(&format!("s{i}"), "P"));
        }
        assert_eq!(roster.count(), 6);
        assert_eq!(roster.grid(), GridLayout { columns: 3, rows: 2 });
    }
}
