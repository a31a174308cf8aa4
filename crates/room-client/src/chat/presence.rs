//! Join/leave notices derived from roster changes.
//!
//! Notices are synthesized locally and never sent on the wire.

/// Language for presence notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    /// Parse a language tag (`en`, `ko`, or a regional variant such as `ko-KR`).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let language = tag.trim().split(|c: char| c == '-' || c == '_').next().unwrap_or_default();
        if language.eq_ignore_ascii_case("en") {
            Some(Self::En)
        } else if language.eq_ignore_ascii_case("ko") {
            Some(Self::Ko)
        } else {
            None
        }
    }
}

/// Notice for a participant who joined.
#[must_use]
pub fn joined(locale: Locale, display_name: &str) -> String {
    match locale {
        Locale::En => format!("{display_name} joined the room"),
        Locale::Ko => format!("{display_name}님이 입장하셨습니다."),
    }
}

/// Notice for a participant who left.
#[must_use]
pub fn left(locale: Locale, display_name: &str) -> String {
    match locale {
        Locale::En => format!("{display_name} left the room"),
        Locale::Ko => format!("{display_name}님이 퇴장하셨습니다."),
    }
}
