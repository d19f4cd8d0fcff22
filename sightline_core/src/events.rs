//! Typed, ID-stamped, timestamped immutable events.
//!
//! Every observable state transition of the pipeline is an append-only
//! `VisualEvent`. Events are constructed exclusively through a per-session
//! [`EventFactory`] so that ids are strictly increasing within a session and
//! never collide across sessions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AudioSid, BBox, LayoutType, RegionKind, Vid};

/// The `source` field stamped on every event emitted by this pipeline.
pub const EVENT_SOURCE: &str = "visual_delta";

// ============================================================================
// EVENT TYPE TAGS
// ============================================================================

/// Discriminant of an event, used for cooldown and priority bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SnapshotReceived,
    VidAppeared,
    VidDisappeared,
    HandRaised,
    HandLowered,
    ScreenShareStarted,
    ScreenShareStopped,
    SlideChanged,
    LayoutChanged,
    AudioVideoLink,
    Unknown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SnapshotReceived => "snapshot_received",
            EventType::VidAppeared => "vid_appeared",
            EventType::VidDisappeared => "vid_disappeared",
            EventType::HandRaised => "hand_raised",
            EventType::HandLowered => "hand_lowered",
            EventType::ScreenShareStarted => "screen_share_started",
            EventType::ScreenShareStopped => "screen_share_stopped",
            EventType::SlideChanged => "slide_changed",
            EventType::LayoutChanged => "layout_changed",
            EventType::AudioVideoLink => "audio_video_link",
            EventType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EVENT PAYLOADS
// ============================================================================

/// Tagged event payload.
///
/// Wire form is `{"type": "...", "payload": {...}}`, matching the event
/// stream protocol. The `Unknown` variant absorbs unrecognized tags so that
/// schema drift degrades to a no-op instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum VisualEventKind {
    SnapshotReceived {
        content_hash: String,
        width: u32,
        height: u32,
    },
    VidAppeared {
        vid: Vid,
        kind: RegionKind,
        bbox: BBox,
    },
    VidDisappeared {
        vid: Vid,
    },
    /// Carries the bbox observed at confirmation time so announcement text
    /// can be rendered from the event alone.
    HandRaised {
        vid: Vid,
        bbox: BBox,
    },
    HandLowered {
        vid: Vid,
        bbox: BBox,
    },
    ScreenShareStarted {
        vid: Vid,
    },
    ScreenShareStopped {
        vid: Vid,
    },
    SlideChanged {
        vid: Vid,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_hash: Option<String>,
        to_hash: String,
    },
    LayoutChanged {
        from: LayoutType,
        to: LayoutType,
    },
    AudioVideoLink {
        vid: Vid,
        audio_sid: AudioSid,
    },
    #[serde(other)]
    Unknown,
}

impl VisualEventKind {
    /// Returns the discriminant of this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            VisualEventKind::SnapshotReceived { .. } => EventType::SnapshotReceived,
            VisualEventKind::VidAppeared { .. } => EventType::VidAppeared,
            VisualEventKind::VidDisappeared { .. } => EventType::VidDisappeared,
            VisualEventKind::HandRaised { .. } => EventType::HandRaised,
            VisualEventKind::HandLowered { .. } => EventType::HandLowered,
            VisualEventKind::ScreenShareStarted { .. } => EventType::ScreenShareStarted,
            VisualEventKind::ScreenShareStopped { .. } => EventType::ScreenShareStopped,
            VisualEventKind::SlideChanged { .. } => EventType::SlideChanged,
            VisualEventKind::LayoutChanged { .. } => EventType::LayoutChanged,
            VisualEventKind::AudioVideoLink { .. } => EventType::AudioVideoLink,
            VisualEventKind::Unknown => EventType::Unknown,
        }
    }

    /// Returns the handle this payload refers to, if any.
    pub fn vid(&self) -> Option<Vid> {
        match self {
            VisualEventKind::VidAppeared { vid, .. }
            | VisualEventKind::VidDisappeared { vid }
            | VisualEventKind::HandRaised { vid, .. }
            | VisualEventKind::HandLowered { vid, .. }
            | VisualEventKind::ScreenShareStarted { vid }
            | VisualEventKind::ScreenShareStopped { vid }
            | VisualEventKind::SlideChanged { vid, .. }
            | VisualEventKind::AudioVideoLink { vid, .. } => Some(*vid),
            _ => None,
        }
    }
}

// ============================================================================
// EVENT ENVELOPE
// ============================================================================

/// An immutable, ID-stamped pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEvent {
    /// Per-session monotonic id, assigned at construction
    pub id: u64,

    /// When the event was emitted (pipeline clock)
    pub ts_emit_ms: u64,

    /// When the underlying snapshot was observed
    pub ts_obs_ms: u64,

    /// Always [`EVENT_SOURCE`]
    pub source: String,

    /// Confidence in `[0, 1]` inherited from the tracker entry
    pub confidence: f64,

    #[serde(flatten)]
    pub kind: VisualEventKind,
}

impl VisualEvent {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

// ============================================================================
// SESSION + FACTORY
// ============================================================================

/// Unique identifier for one pipeline session.
///
/// Uses UUID v4 for global uniqueness without coordination; continuity
/// handles are local to a session and never linkable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 8 chars are enough for log readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Mints ID-stamped events for one session.
///
/// The counter is owned per session, never module-global: in a multi-session
/// deployment each session keeps its own strictly increasing id sequence.
#[derive(Debug)]
pub struct EventFactory {
    session: SessionId,
    next_id: u64,
}

impl EventFactory {
    pub fn new(session: SessionId) -> Self {
        Self { session, next_id: 1 }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Number of events issued so far.
    pub fn issued(&self) -> u64 {
        self.next_id - 1
    }

    /// Constructs an event, stamping the next id.
    pub fn emit(
        &mut self,
        kind: VisualEventKind,
        ts_obs_ms: u64,
        ts_emit_ms: u64,
        confidence: f64,
    ) -> VisualEvent {
        let id = self.next_id;
        self.next_id += 1;
        VisualEvent {
            id,
            ts_emit_ms,
            ts_obs_ms,
            source: EVENT_SOURCE.to_string(),
            confidence,
            kind,
        }
    }

    /// Starts a fresh session: new session id, counter back to 1.
    pub fn reset(&mut self) {
        self.session = SessionId::new();
        self.next_id = 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_ids_strictly_increase() {
        let mut factory = EventFactory::new(SessionId::new());
        let mut last = 0;
        for _ in 0..100 {
            let event = factory.emit(VisualEventKind::Unknown, 1000, 1000, 1.0);
            assert!(event.id > last);
            last = event.id;
        }
        assert_eq!(factory.issued(), 100);
    }

    #[test]
    fn test_factory_reset_changes_session() {
        let mut factory = EventFactory::new(SessionId::new());
        let before = factory.session();
        factory.emit(VisualEventKind::Unknown, 0, 0, 1.0);
        factory.reset();
        assert_ne!(factory.session(), before);
        assert_eq!(factory.issued(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let mut factory = EventFactory::new(SessionId::new());
        let event = factory.emit(
            VisualEventKind::HandRaised {
                vid: Vid::from_index(1),
                bbox: BBox::new(0.0, 0.0, 0.5, 0.5),
            },
            1000,
            1002,
            0.9,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["source"], "visual_delta");
        assert_eq!(json["type"], "hand_raised");
        assert_eq!(json["payload"]["vid"], "v1");
        assert_eq!(json["payload"]["bbox"]["w"], 0.5);
    }

    #[test]
    fn test_slide_changed_omits_absent_from_hash() {
        let mut factory = EventFactory::new(SessionId::new());
        let event = factory.emit(
            VisualEventKind::SlideChanged {
                vid: Vid::from_index(2),
                from_hash: None,
                to_hash: "00c0ffee".to_string(),
            },
            0,
            0,
            1.0,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["payload"].get("from_hash").is_none());
        assert_eq!(json["payload"]["to_hash"], "00c0ffee");
    }

    #[test]
    fn test_unknown_tag_deserializes_to_unknown() {
        let json = r#"{
            "id": 9, "ts_emit_ms": 5, "ts_obs_ms": 5,
            "source": "visual_delta", "confidence": 1.0,
            "type": "holographic_wave", "payload": {}
        }"#;
        let event: VisualEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type(), EventType::Unknown);
    }
}
