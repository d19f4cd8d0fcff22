//! World model and its pure, event-driven reducer.
//!
//! [`VisualState`] is the projection of everything the pipeline currently
//! believes about the meeting surface. [`reduce`] rebuilds it from any event
//! log, independently of the delta detector, which makes the state
//! reconstructible for replay and testing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::{VisualEvent, VisualEventKind};
use crate::types::{AudioSid, BBox, LayoutType, RegionKind, RegionSignals, Vid};

// ============================================================================
// STATE SHAPES
// ============================================================================

/// Per-handle projection of confirmed signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VidState {
    pub vid: Vid,
    pub last_seen_ms: u64,
    pub bbox: BBox,
    pub kind: RegionKind,
    pub signals: RegionSignals,
    pub confidence: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sid: Option<AudioSid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Top-level screen-share projection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenShareState {
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<Vid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_hash: Option<String>,
}

/// The world model: one entry per live continuity handle plus derived
/// aggregates.
///
/// `hand_raised_count` is derived and always recomputed from the signals
/// after any mutation; it is never a trusted cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualState {
    pub vids: BTreeMap<Vid, VidState>,
    pub screen_share: ScreenShareState,
    pub layout: LayoutType,
    pub hand_raised_count: usize,
    pub last_snapshot_ms: u64,
    pub snapshot_count: u64,
}

impl VisualState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participant tiles currently tracked.
    pub fn participant_count(&self) -> usize {
        self.vids
            .values()
            .filter(|v| v.kind == RegionKind::Tile)
            .count()
    }

    /// Recomputes the derived hand-raise counter from the signals.
    pub fn recompute_hand_raised_count(&mut self) {
        self.hand_raised_count = self
            .vids
            .values()
            .filter(|v| v.signals.hand_raised == Some(true))
            .count();
    }
}

// ============================================================================
// REDUCER
// ============================================================================

/// Applies one event to the state.
///
/// Pure with respect to its inputs; unknown event variants are no-ops so
/// that schema drift never corrupts the model.
pub fn reduce(mut state: VisualState, event: &VisualEvent) -> VisualState {
    match &event.kind {
        VisualEventKind::SnapshotReceived { .. } => {
            state.last_snapshot_ms = event.ts_obs_ms;
            state.snapshot_count += 1;
        }

        VisualEventKind::VidAppeared { vid, kind, bbox } => {
            state.vids.insert(
                *vid,
                VidState {
                    vid: *vid,
                    last_seen_ms: event.ts_obs_ms,
                    bbox: *bbox,
                    kind: *kind,
                    signals: RegionSignals::default(),
                    confidence: event.confidence,
                    audio_sid: None,
                    fingerprint: None,
                },
            );
        }

        VisualEventKind::VidDisappeared { vid } => {
            state.vids.remove(vid);
            if state.screen_share.vid == Some(*vid) {
                state.screen_share = ScreenShareState::default();
            }
            state.recompute_hand_raised_count();
        }

        VisualEventKind::HandRaised { vid, bbox } => {
            if let Some(entry) = state.vids.get_mut(vid) {
                entry.signals.hand_raised = Some(true);
                entry.bbox = *bbox;
                entry.last_seen_ms = event.ts_obs_ms;
            }
            state.recompute_hand_raised_count();
        }

        VisualEventKind::HandLowered { vid, bbox } => {
            if let Some(entry) = state.vids.get_mut(vid) {
                entry.signals.hand_raised = Some(false);
                entry.bbox = *bbox;
                entry.last_seen_ms = event.ts_obs_ms;
            }
            state.recompute_hand_raised_count();
        }

        VisualEventKind::ScreenShareStarted { vid } => {
            let slide_hash = state.vids.get_mut(vid).and_then(|entry| {
                entry.signals.is_presenting = Some(true);
                entry.signals.slide_hash.clone()
            });
            state.screen_share = ScreenShareState {
                active: true,
                vid: Some(*vid),
                slide_hash,
            };
        }

        VisualEventKind::ScreenShareStopped { vid } => {
            if let Some(entry) = state.vids.get_mut(vid) {
                entry.signals.is_presenting = Some(false);
                entry.signals.slide_hash = None;
            }
            if state.screen_share.vid == Some(*vid) {
                state.screen_share = ScreenShareState::default();
            }
        }

        VisualEventKind::SlideChanged { vid, to_hash, .. } => {
            if let Some(entry) = state.vids.get_mut(vid) {
                entry.signals.slide_hash = Some(to_hash.clone());
            }
            if state.screen_share.vid == Some(*vid) {
                state.screen_share.slide_hash = Some(to_hash.clone());
            }
        }

        VisualEventKind::LayoutChanged { to, .. } => {
            state.layout = *to;
        }

        VisualEventKind::AudioVideoLink { vid, audio_sid } => {
            if let Some(entry) = state.vids.get_mut(vid) {
                entry.audio_sid = Some(audio_sid.clone());
            }
        }

        // Forward-compat: unrecognized events leave the state untouched
        VisualEventKind::Unknown => {}
    }
    state
}

// ============================================================================
// TESTS
// ============================================================================
