//! Domain types shared by the chat flow, the stores and the UI

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trust score at or below which a relationship is considered broken
pub const BREAK_THRESHOLD: i64 = -100;

/// Name shown before calibration has produced a persona
pub const UNNAMED_PERSONA: &str = "Subject";

/// Who a transcript line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
    System,
}

/// One transcript line
///
/// Serialized as `{id, text, type}` so persisted transcripts stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Disambiguates ids minted within the same millisecond
static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

impl Message {
    /// Create a message with a fresh local id
    ///
    /// Ids are the submission time in milliseconds plus a process-wide
    /// sequence number, so a user line and the replies appended right after it
    /// never collide.
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}", millis, seq),
            text: text.into(),
            kind,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Ai, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }
}

/// Relationship status as reported by the backend
///
/// Locally only `Active` and `Broken` matter; the other states appear in
/// listings (a simulation still calibrating, an archived one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SimulationStatus {
    #[default]
    Active,
    Broken,
    Calibrating,
    Archived,
    #[serde(other)]
    Unknown,
}

impl SimulationStatus {
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken)
    }

    /// Label used in headers and listings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Broken => "DISCONNECTED",
            Self::Calibrating => "CALIBRATING",
            Self::Archived => "ARCHIVED",
            Self::Active | Self::Unknown => "ACTIVE",
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Whether a score forces the relationship into the broken state
pub fn is_breaking_score(score: i64) -> bool {
    score <= BREAK_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("hello");
        let b = Message::ai("hi");
        let c = Message::system("time passes");
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn test_message_serializes_type_field() {
        let msg = Message {
            id: "1".to_string(),
            text: "hi".to_string(),
            kind: MessageKind::Ai,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ai");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn test_status_parses_unknown_values() {
        let status: SimulationStatus = serde_json::from_str("\"BROKEN\"").unwrap();
        assert_eq!(status, SimulationStatus::Broken);

        let status: SimulationStatus = serde_json::from_str("\"HIBERNATING\"").unwrap();
        assert_eq!(status, SimulationStatus::Unknown);
        assert!(!status.is_broken());
    }

    #[test]
    fn test_break_threshold_is_inclusive() {
        assert!(is_breaking_score(-100));
        assert!(is_breaking_score(-250));
        assert!(!is_breaking_score(-99));
        assert!(!is_breaking_score(5));
    }
}
