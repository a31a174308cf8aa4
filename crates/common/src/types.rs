//! Identifier newtypes shared across Huddle components.
//!
//! All identifiers are assigned externally (by the broker or the media
//! transport), so they wrap opaque strings rather than generated UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an externally assigned identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Room identifier chosen by the user (e.g. `room-42`).
    SessionId
);

string_id!(
    /// Identifier of one published media stream, stable for its lifetime.
    StreamId
);

string_id!(
    /// Identifier the transport assigns to one connection within a session.
    ConnectionId
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_as_str() {
        let id = SessionId::new("room-42");
        assert_eq!(id.to_string(), "room-42");
        assert_eq!(id.as_str(), "room-42");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = StreamId::from("str_CAM_abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"str_CAM_abc\"");

        let back: StreamId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_distinct_types_compare_by_value() {
        let a = ConnectionId::from("con_1".to_string());
        let b = ConnectionId::new("con_1");
        assert_eq!(a, b);
    }
}
