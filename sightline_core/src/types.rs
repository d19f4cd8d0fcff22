//! Common types for the visual-delta pipeline.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ============================================================================
// GEOMETRY
// ============================================================================

/// Normalized rectangle relative to the composite frame.
///
/// All fields are in `[0, 1]`. A bbox is valid when `w > 0`, `h > 0`, and the
/// right/bottom edges stay within the frame up to `EDGE_TOLERANCE`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    /// Tolerance on the right/bottom edge check (`x + w ≤ 1 + ε`).
    pub const EDGE_TOLERANCE: f64 = 1e-6;

    /// Creates a new bounding box.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Returns the center point of the box.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn center_distance(&self, other: &BBox) -> f64 {
        nalgebra::distance(&self.center(), &other.center())
    }

    /// Checks the normalization invariants.
    ///
    /// Rejects NaN/infinite coordinates, non-positive extents, and boxes
    /// extending past the frame edge. Invalid boxes are skipped by the
    /// tracker rather than propagated.
    pub fn is_valid(&self) -> bool {
        let finite = self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite();
        finite
            && self.w > 0.0
            && self.h > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.w <= 1.0 + Self::EDGE_TOLERANCE
            && self.y + self.h <= 1.0 + Self::EDGE_TOLERANCE
    }
}

// ============================================================================
// REGION / LAYOUT CLASSIFICATION
// ============================================================================

/// What a detected region is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// A participant video tile
    Tile,
    /// A shared-screen surface
    ScreenShare,
    /// Unclassified region
    Unknown,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Tile => "tile",
            RegionKind::ScreenShare => "screen_share",
            RegionKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall arrangement of the meeting UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    Grid,
    Speaker,
    Presentation,
    #[default]
    Unknown,
}

impl LayoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::Grid => "grid",
            LayoutType::Speaker => "speaker",
            LayoutType::Presentation => "presentation",
            LayoutType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CONTINUITY HANDLE
// ============================================================================

/// Session-local visual continuity handle.
///
/// A `Vid` identifies "the same region as before" across snapshots. It is
/// minted by the tracker, ordered by mint order, and never reused after
/// expiry. It carries no identity: the only inputs to continuity matching
/// are position buckets and average color.
///
/// Wire form is `"v"` followed by the 1-based mint index, e.g. `v3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vid(u32);

impl Vid {
    /// Creates a handle from its 1-based mint index.
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the 1-based mint index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Vid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl std::str::FromStr for Vid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| format!("handle must start with 'v': {:?}", s))?;
        let index: u32 = digits
            .parse()
            .map_err(|_| format!("handle index is not an integer: {:?}", s))?;
        if index == 0 {
            return Err(format!("handle index is 1-based: {:?}", s));
        }
        Ok(Vid(index))
    }
}

impl Serialize for Vid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Vid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque external reference to an audio stream.
///
/// The core never interprets this value; it only carries it so that callers
/// can correlate audio and video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioSid(pub String);

impl AudioSid {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AudioSid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SNAPSHOT INPUT
// ============================================================================

/// Instantaneous per-region signals extracted from a snapshot.
///
/// Every field is optional: absent means "not observed this snapshot".
/// Boolean absence is treated as `false` by the delta detector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_raised: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_on: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active_speaker: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_presenting: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_hash: Option<String>,
}

/// A single region of a snapshot, as produced by snapshot analysis.
///
/// This is the sole input shape of the core per snapshot tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub bbox: BBox,
    pub kind: RegionKind,
    pub fingerprint: String,
    #[serde(default)]
    pub signals: RegionSignals,
}

impl DetectedRegion {
    /// Creates a region with no signals set.
    pub fn new(bbox: BBox, kind: RegionKind, fingerprint: impl Into<String>) -> Self {
        Self {
            bbox,
            kind,
            fingerprint: fingerprint.into(),
            signals: RegionSignals::default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_center() {
        let bbox = BBox::new(0.2, 0.4, 0.2, 0.2);
        let c = bbox.center();
        assert!((c.x - 0.3).abs() < 1e-12);
        assert!((c.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bbox_validity() {
        assert!(BBox::new(0.0, 0.0, 0.5, 0.5).is_valid());
        assert!(BBox::new(0.5, 0.5, 0.5, 0.5).is_valid()); // exactly at edge
        assert!(!BBox::new(0.0, 0.0, 0.0, 0.5).is_valid()); // zero width
        assert!(!BBox::new(0.6, 0.0, 0.5, 0.5).is_valid()); // overhangs right edge
        assert!(!BBox::new(f64::NAN, 0.0, 0.5, 0.5).is_valid());
        assert!(!BBox::new(-0.1, 0.0, 0.5, 0.5).is_valid());
    }

    #[test]
    fn test_vid_wire_form() {
        let vid = Vid::from_index(7);
        assert_eq!(vid.to_string(), "v7");
        assert_eq!("v7".parse::<Vid>().unwrap(), vid);
        assert!("7".parse::<Vid>().is_err());
        assert!("v0".parse::<Vid>().is_err());
        assert!("vx".parse::<Vid>().is_err());
    }

    #[test]
    fn test_vid_serde_roundtrip() {
        let vid = Vid::from_index(12);
        let json = serde_json::to_string(&vid).unwrap();
        assert_eq!(json, "\"v12\"");
        let back: Vid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vid);
    }

    #[test]
    fn test_region_signals_partial_wire() {
        let json = r#"{"handRaised":true}"#;
        // Wire signals use snake_case field names; camelCase must not parse silently.
        assert!(serde_json::from_str::<RegionSignals>(json).unwrap().hand_raised.is_none());

        let json = r#"{"hand_raised":true,"slide_hash":"abc"}"#;
        let signals: RegionSignals = serde_json::from_str(json).unwrap();
        assert_eq!(signals.hand_raised, Some(true));
        assert_eq!(signals.slide_hash.as_deref(), Some("abc"));
        assert!(signals.camera_on.is_none());
    }
}
