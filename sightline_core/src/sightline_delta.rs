//! The "DELTA" Engine - Debounced State Transition Layer
//!
//! Consumes one snapshot's regions plus tracker output and produces the
//! append-only event stream and the next world model. Solves the noisy-input
//! problem with a per-(handle, signal) debounce:
//! - A boolean change must persist across N consecutive snapshots to fire
//! - Any reversion to the confirmed value cancels the pending change
//! - At most one event fires per true edge
//!
//! Events of one call are emitted in a fixed order: snapshot received,
//! appearances (input order), disappearances, per-region signal transitions
//! (input order, booleans before slide hash), then layout change.

use std::collections::BTreeMap;

use crate::events::{EventFactory, VisualEvent, VisualEventKind};
use crate::sightline_tracking::{TrackerConfig, TrackReport, VidTracker};
use crate::state::{ScreenShareState, VidState, VisualState};
use crate::types::{DetectedRegion, LayoutType, RegionSignals, Vid};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the DeltaDetector
#[derive(Debug, Clone)]
pub struct DeltaConfig {
    /// Consecutive snapshots a boolean change must persist before an event
    /// fires (default: 2)
    pub debounce_snapshots: u32,

    /// Configuration of the embedded tracker
    pub tracker: TrackerConfig,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            debounce_snapshots: 2,
            tracker: TrackerConfig::default(),
        }
    }
}

// ============================================================================
// DEBOUNCE STATE
// ============================================================================

/// Debounced boolean signals, one key-space per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SignalField {
    HandRaised,
    Presenting,
}

/// A boolean change observed but not yet confirmed.
#[derive(Debug, Clone)]
struct PendingSignal {
    /// Target value the change is heading toward
    value: bool,

    /// Consecutive snapshots the target has been observed
    seen_count: u32,

    /// When the change was first observed; kept for diagnostics
    #[allow(dead_code)]
    first_seen_ms: u64,
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Result of one `compute_deltas` call.
#[derive(Debug)]
pub struct DeltaOutput {
    pub next_state: VisualState,
    pub events: Vec<VisualEvent>,

    /// Regions dropped by the tracker for failing validation
    pub skipped_regions: usize,
}

// ============================================================================
// DELTA DETECTOR (The Engine)
// ============================================================================

/// Turns snapshot sequences into debounced, deduplicated events.
///
/// Owns its tracker and the per-(handle, signal) debounce state. All
/// bookkeeping for a handle is purged atomically with its disappearance.
///
/// Deterministic tie-break: when several handles have a confirmed
/// screen-share signal, the lowest handle in the rebuilt state map owns the
/// top-level `screen_share` slot.
pub struct DeltaDetector {
    /// Debounce depth, from configuration
    debounce_snapshots: u32,

    /// Embedded continuity tracker
    tracker: VidTracker,

    /// Observed-but-unconfirmed boolean changes
    pending: BTreeMap<(Vid, SignalField), PendingSignal>,

    /// Last confirmed boolean values (absent means false)
    confirmed: BTreeMap<(Vid, SignalField), bool>,

    /// Last emitted (or seeded) slide hash per presenting handle
    confirmed_slides: BTreeMap<Vid, String>,

    /// Last known layout
    previous_layout: LayoutType,
}

impl DeltaDetector {
    /// Creates a new detector with the given configuration.
    pub fn new(config: DeltaConfig) -> Self {
        Self {
            debounce_snapshots: config.debounce_snapshots.max(1),
            tracker: VidTracker::new(config.tracker),
            pending: BTreeMap::new(),
            confirmed: BTreeMap::new(),
            confirmed_slides: BTreeMap::new(),
            previous_layout: LayoutType::Unknown,
        }
    }

    /// Creates a new detector with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DeltaConfig::default())
    }

    /// Read access to the embedded tracker.
    pub fn tracker(&self) -> &VidTracker {
        &self.tracker
    }

    /// Restores the detector to its initial state.
    ///
    /// The tracker is rebuilt, so handle indices restart; callers pair this
    /// with a fresh event session.
    pub fn reset(&mut self) {
        let config = self.tracker.config().clone();
        self.tracker = VidTracker::new(config);
        self.pending.clear();
        self.confirmed.clear();
        self.confirmed_slides.clear();
        self.previous_layout = LayoutType::Unknown;
    }

    // ========================================================================
    // MAIN CYCLE
    // ========================================================================

    /// Processes one snapshot: runs the tracker, diffs signals against the
    /// confirmed set, and rebuilds the world model.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_deltas(
        &mut self,
        prev_state: &VisualState,
        regions: &[DetectedRegion],
        detected_layout: LayoutType,
        now_ms: u64,
        content_hash: &str,
        width: u32,
        height: u32,
        factory: &mut EventFactory,
    ) -> DeltaOutput {
        let mut events = Vec::new();

        events.push(factory.emit(
            VisualEventKind::SnapshotReceived {
                content_hash: content_hash.to_string(),
                width,
                height,
            },
            now_ms,
            now_ms,
            1.0,
        ));

        let report = self.tracker.process_regions(regions, now_ms);

        // Appearances, in input-region order
        for vid in &report.appeared {
            if let Some(entry) = self.tracker.get_entry(vid) {
                events.push(factory.emit(
                    VisualEventKind::VidAppeared {
                        vid: *vid,
                        kind: entry.kind,
                        bbox: entry.bbox,
                    },
                    now_ms,
                    now_ms,
                    entry.confidence,
                ));
            }
        }

        // Disappearances; all debounce bookkeeping for the handle goes with it
        for vid in &report.expired {
            events.push(factory.emit(
                VisualEventKind::VidDisappeared { vid: *vid },
                now_ms,
                now_ms,
                1.0,
            ));
            self.purge_vid(*vid);
        }

        // Per-region signal transitions, input order, booleans first
        for assignment in &report.assignments {
            let region = &regions[assignment.region_index];
            let vid = assignment.vid;
            let confidence = self
                .tracker
                .get_entry(&vid)
                .map(|e| e.confidence)
                .unwrap_or(1.0);

            let hand = region.signals.hand_raised.unwrap_or(false);
            if let Some(raised) = self.debounce(vid, SignalField::HandRaised, hand, now_ms) {
                let kind = if raised {
                    VisualEventKind::HandRaised { vid, bbox: region.bbox }
                } else {
                    VisualEventKind::HandLowered { vid, bbox: region.bbox }
                };
                events.push(factory.emit(kind, now_ms, now_ms, confidence));
            }

            let presenting = region.signals.is_presenting.unwrap_or(false);
            if let Some(sharing) = self.debounce(vid, SignalField::Presenting, presenting, now_ms) {
                if sharing {
                    events.push(factory.emit(
                        VisualEventKind::ScreenShareStarted { vid },
                        now_ms,
                        now_ms,
                        confidence,
                    ));
                    // Seed the slide baseline so the first slide of a share
                    // does not fire a slide change
                    if let Some(hash) = non_empty(&region.signals.slide_hash) {
                        self.confirmed_slides.insert(vid, hash.to_string());
                    }
                } else {
                    events.push(factory.emit(
                        VisualEventKind::ScreenShareStopped { vid },
                        now_ms,
                        now_ms,
                        confidence,
                    ));
                    self.confirmed_slides.remove(&vid);
                }
            }

            // Slide changes only while the confirmed share is on, undebounced
            if self.is_confirmed(vid, SignalField::Presenting) {
                if let Some(hash) = non_empty(&region.signals.slide_hash) {
                    let previous = self.confirmed_slides.get(&vid).cloned();
                    if previous.as_deref() != Some(hash) {
                        self.confirmed_slides.insert(vid, hash.to_string());
                        events.push(factory.emit(
                            VisualEventKind::SlideChanged {
                                vid,
                                from_hash: previous,
                                to_hash: hash.to_string(),
                            },
                            now_ms,
                            now_ms,
                            confidence,
                        ));
                    }
                }
            }
        }

        // Layout transition (unknown never overwrites a known layout)
        if detected_layout != LayoutType::Unknown && detected_layout != self.previous_layout {
            events.push(factory.emit(
                VisualEventKind::LayoutChanged {
                    from: self.previous_layout,
                    to: detected_layout,
                },
                now_ms,
                now_ms,
                1.0,
            ));
            self.previous_layout = detected_layout;
        }

        let next_state = self.project_state(prev_state, regions, &report, now_ms);

        DeltaOutput {
            next_state,
            events,
            skipped_regions: report.skipped_regions,
        }
    }

    // ========================================================================
    // DEBOUNCE PROTOCOL
    // ========================================================================

    /// Advances the debounce state machine for one (handle, field) key.
    ///
    /// Returns `Some(target)` exactly when a transition confirms on this
    /// snapshot. A reading equal to the confirmed value cancels any pending
    /// change; a reading toward a different target restarts the count.
    fn debounce(&mut self, vid: Vid, field: SignalField, incoming: bool, now_ms: u64) -> Option<bool> {
        let key = (vid, field);
        let confirmed = self.confirmed.get(&key).copied().unwrap_or(false);

        if incoming == confirmed {
            self.pending.remove(&key);
            return None;
        }

        let seen = match self.pending.get_mut(&key) {
            Some(pending) if pending.value == incoming => {
                pending.seen_count += 1;
                pending.seen_count
            }
            _ => {
                self.pending.insert(
                    key,
                    PendingSignal {
                        value: incoming,
                        seen_count: 1,
                        first_seen_ms: now_ms,
                    },
                );
                1
            }
        };

        if seen >= self.debounce_snapshots {
            self.pending.remove(&key);
            self.confirmed.insert(key, incoming);
            Some(incoming)
        } else {
            None
        }
    }

    fn is_confirmed(&self, vid: Vid, field: SignalField) -> bool {
        self.confirmed.get(&(vid, field)).copied().unwrap_or(false)
    }

    /// Removes all debounce bookkeeping for a departed handle.
    fn purge_vid(&mut self, vid: Vid) {
        self.pending.retain(|(v, _), _| *v != vid);
        self.confirmed.retain(|(v, _), _| *v != vid);
        self.confirmed_slides.remove(&vid);
    }

    // ========================================================================
    // STATE PROJECTION
    // ========================================================================

    /// Rebuilds the world model from scratch for every assigned handle.
    ///
    /// Booleans come from the confirmed set; `camera_on` and
    /// `is_active_speaker` pass through unmodified; the slide hash passes
    /// through only while the confirmed share is on. `audio_sid` survives
    /// from the previous state (linked externally through the reducer).
    fn project_state(
        &self,
        prev_state: &VisualState,
        regions: &[DetectedRegion],
        report: &TrackReport,
        now_ms: u64,
    ) -> VisualState {
        let mut vids = BTreeMap::new();

        for assignment in &report.assignments {
            let region = &regions[assignment.region_index];
            let vid = assignment.vid;

            let hand_raised = self.is_confirmed(vid, SignalField::HandRaised);
            let presenting = self.is_confirmed(vid, SignalField::Presenting);

            let (kind, confidence, fingerprint) = match self.tracker.get_entry(&vid) {
                Some(entry) => (entry.kind, entry.confidence, Some(entry.fingerprint.clone())),
                None => (region.kind, 1.0, None),
            };

            let signals = RegionSignals {
                hand_raised: Some(hand_raised),
                camera_on: region.signals.camera_on,
                is_active_speaker: region.signals.is_active_speaker,
                is_presenting: Some(presenting),
                slide_hash: if presenting {
                    non_empty(&region.signals.slide_hash).map(str::to_string)
                } else {
                    None
                },
            };

            let audio_sid = prev_state.vids.get(&vid).and_then(|v| v.audio_sid.clone());

            vids.insert(
                vid,
                VidState {
                    vid,
                    last_seen_ms: now_ms,
                    bbox: region.bbox,
                    kind,
                    signals,
                    confidence,
                    audio_sid,
                    fingerprint,
                },
            );
        }

        // Lowest presenting handle owns the share slot
        let mut screen_share = ScreenShareState::default();
        for (vid, vid_state) in &vids {
            if vid_state.signals.is_presenting == Some(true) {
                screen_share = ScreenShareState {
                    active: true,
                    vid: Some(*vid),
                    slide_hash: vid_state
                        .signals
                        .slide_hash
                        .clone()
                        .or_else(|| self.confirmed_slides.get(vid).cloned()),
                };
                break;
            }
        }

        let hand_raised_count = vids
            .values()
            .filter(|v| v.signals.hand_raised == Some(true))
            .count();

        VisualState {
            vids,
            screen_share,
            layout: self.previous_layout,
            hand_raised_count,
            last_snapshot_ms: now_ms,
            snapshot_count: prev_state.snapshot_count + 1,
        }
    }
}

fn non_empty(hash: &Option<String>) -> Option<&str> {
    hash.as_deref().filter(|h| !h.is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventFactory, EventType, SessionId};
    use crate::types::{BBox, RegionKind};

    fn factory() -> EventFactory {
        EventFactory::new(SessionId::new())
    }

    fn tile_with(signals: RegionSignals) -> DetectedRegion {
        DetectedRegion {
            bbox: BBox::new(0.0, 0.0, 0.5, 0.5),
            kind: RegionKind::Tile,
            fingerprint: "POS:0055".to_string(),
            signals,
        }
    }

    fn hand_tile(raised: bool) -> DetectedRegion {
        tile_with(RegionSignals {
            hand_raised: Some(raised),
            ..Default::default()
        })
    }

    fn presenter(slide: &str) -> DetectedRegion {
        DetectedRegion {
            kind: RegionKind::ScreenShare,
            ..tile_with(RegionSignals {
                is_presenting: Some(true),
                slide_hash: Some(slide.to_string()),
                ..Default::default()
            })
        }
    }

    fn types_of(events: &[VisualEvent]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type()).collect()
    }

    fn run_snapshot(
        detector: &mut DeltaDetector,
        state: &VisualState,
        regions: &[DetectedRegion],
        now_ms: u64,
        factory: &mut EventFactory,
    ) -> DeltaOutput {
        detector.compute_deltas(
            state,
            regions,
            LayoutType::Unknown,
            now_ms,
            "00000000",
            640,
            360,
            factory,
        )
    }

    #[test]
    fn test_debounced_hand_raise_fires_once() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        // Snapshot 1: appearance, hand pending
        let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 1000, &mut f);
        assert_eq!(
            types_of(&out.events),
            vec![EventType::SnapshotReceived, EventType::VidAppeared]
        );
        state = out.next_state;

        // Snapshot 2: debounce confirms
        let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 2000, &mut f);
        assert_eq!(
            types_of(&out.events),
            vec![EventType::SnapshotReceived, EventType::HandRaised]
        );
        state = out.next_state;
        assert_eq!(state.hand_raised_count, 1);

        // Ten more identical snapshots: no further hand events
        let mut raises = 0;
        for i in 0..10u64 {
            let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 3000 + i * 1000, &mut f);
            raises += out
                .events
                .iter()
                .filter(|e| e.event_type() == EventType::HandRaised)
                .count();
            state = out.next_state;
        }
        assert_eq!(raises, 0);
        assert_eq!(state.hand_raised_count, 1);
    }

    #[test]
    fn test_single_snapshot_flicker_is_suppressed() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        // true for exactly one snapshot, then back to false
        let sequence = [false, true, false, false, true, false];
        for (i, raised) in sequence.iter().enumerate() {
            let out = run_snapshot(
                &mut detector,
                &state,
                &[hand_tile(*raised)],
                1000 + i as u64 * 1000,
                &mut f,
            );
            for event in &out.events {
                assert!(
                    !matches!(
                        event.event_type(),
                        EventType::HandRaised | EventType::HandLowered
                    ),
                    "flicker must not fire: {:?}",
                    event
                );
            }
            state = out.next_state;
        }
        assert_eq!(state.hand_raised_count, 0);
    }

    #[test]
    fn test_edge_count_matches_confirmed_transitions() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        // Two genuine raise edges and one genuine lower edge
        let sequence = [true, true, false, false, true, true];
        let mut raised_events = 0;
        let mut lowered_events = 0;
        for (i, value) in sequence.iter().enumerate() {
            let out = run_snapshot(
                &mut detector,
                &state,
                &[hand_tile(*value)],
                1000 + i as u64 * 1000,
                &mut f,
            );
            for event in &out.events {
                match event.event_type() {
                    EventType::HandRaised => raised_events += 1,
                    EventType::HandLowered => lowered_events += 1,
                    _ => {}
                }
            }
            state = out.next_state;
        }
        assert_eq!(raised_events, 2);
        assert_eq!(lowered_events, 1);
    }

    #[test]
    fn test_expiry_emits_disappearance_and_purges() {
        let config = DeltaConfig {
            debounce_snapshots: 2,
            tracker: TrackerConfig {
                expire_ms: 5000,
                ..Default::default()
            },
        };
        let mut detector = DeltaDetector::new(config);
        let mut f = factory();
        let mut state = VisualState::new();

        let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 1000, &mut f);
        state = out.next_state;
        let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 2000, &mut f);
        state = out.next_state;
        assert_eq!(state.hand_raised_count, 1);

        let out = run_snapshot(&mut detector, &state, &[], 8000, &mut f);
        assert_eq!(
            types_of(&out.events),
            vec![EventType::SnapshotReceived, EventType::VidDisappeared]
        );
        state = out.next_state;
        assert!(state.vids.is_empty());
        assert_eq!(state.hand_raised_count, 0);

        // A new region at the same spot is a fresh handle with a clean slate
        let out = run_snapshot(&mut detector, &state, &[hand_tile(false)], 9000, &mut f);
        assert_eq!(out.next_state.vids.keys().next(), Some(&Vid::from_index(2)));
    }

    #[test]
    fn test_slide_change_fires_once_per_transition() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        // Share confirms at t=2000; slide "a" is the seeded baseline
        let out = run_snapshot(&mut detector, &state, &[presenter("a")], 1000, &mut f);
        state = out.next_state;
        let out = run_snapshot(&mut detector, &state, &[presenter("a")], 2000, &mut f);
        assert_eq!(
            types_of(&out.events),
            vec![EventType::SnapshotReceived, EventType::ScreenShareStarted]
        );
        state = out.next_state;
        assert!(state.screen_share.active);
        assert_eq!(state.screen_share.slide_hash.as_deref(), Some("a"));

        // Slide transition a -> b
        let out = run_snapshot(&mut detector, &state, &[presenter("b")], 3000, &mut f);
        let slides: Vec<_> = out
            .events
            .iter()
            .filter(|e| e.event_type() == EventType::SlideChanged)
            .collect();
        assert_eq!(slides.len(), 1);
        match &slides[0].kind {
            VisualEventKind::SlideChanged { from_hash, to_hash, .. } => {
                assert_eq!(from_hash.as_deref(), Some("a"));
                assert_eq!(to_hash, "b");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        state = out.next_state;

        // Same slide again: silent
        let out = run_snapshot(&mut detector, &state, &[presenter("b")], 4000, &mut f);
        assert!(out
            .events
            .iter()
            .all(|e| e.event_type() != EventType::SlideChanged));
    }

    #[test]
    fn test_slide_ignored_until_share_confirms() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let state = VisualState::new();

        // First snapshot: share still pending, slide must not fire
        let out = run_snapshot(&mut detector, &state, &[presenter("a")], 1000, &mut f);
        assert!(out
            .events
            .iter()
            .all(|e| e.event_type() != EventType::SlideChanged));
    }

    #[test]
    fn test_empty_slide_hash_never_fires() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        let blank = DetectedRegion {
            kind: RegionKind::ScreenShare,
            ..tile_with(RegionSignals {
                is_presenting: Some(true),
                slide_hash: Some(String::new()),
                ..Default::default()
            })
        };

        for i in 0..4u64 {
            let out = run_snapshot(&mut detector, &state, &[blank.clone()], 1000 + i * 1000, &mut f);
            assert!(out
                .events
                .iter()
                .all(|e| e.event_type() != EventType::SlideChanged));
            state = out.next_state;
        }
    }

    #[test]
    fn test_layout_change_emitted_once() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        let out = detector.compute_deltas(
            &state, &[], LayoutType::Grid, 1000, "00000000", 640, 360, &mut f,
        );
        assert_eq!(
            types_of(&out.events),
            vec![EventType::SnapshotReceived, EventType::LayoutChanged]
        );
        state = out.next_state;
        assert_eq!(state.layout, LayoutType::Grid);

        // Same layout again: silent
        let out = detector.compute_deltas(
            &state, &[], LayoutType::Grid, 2000, "00000000", 640, 360, &mut f,
        );
        assert!(types_of(&out.events) == vec![EventType::SnapshotReceived]);
        state = out.next_state;

        // Unknown never overwrites a known layout
        let out = detector.compute_deltas(
            &state, &[], LayoutType::Unknown, 3000, "00000000", 640, 360, &mut f,
        );
        assert_eq!(out.next_state.layout, LayoutType::Grid);
    }

    #[test]
    fn test_lowest_handle_wins_share_slot() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        let left = DetectedRegion {
            bbox: BBox::new(0.0, 0.0, 0.4, 0.4),
            ..presenter("a")
        };
        let right = DetectedRegion {
            bbox: BBox::new(0.6, 0.6, 0.4, 0.4),
            ..presenter("z")
        };

        for i in 0..2u64 {
            let out = run_snapshot(
                &mut detector,
                &state,
                &[left.clone(), right.clone()],
                1000 + i * 1000,
                &mut f,
            );
            state = out.next_state;
        }

        assert!(state.screen_share.active);
        assert_eq!(state.screen_share.vid, Some(Vid::from_index(1)));
    }

    #[test]
    fn test_event_ids_monotonic_across_snapshots() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();
        let mut last_id = 0;

        for i in 0..6u64 {
            let out = run_snapshot(
                &mut detector,
                &state,
                &[hand_tile(i % 2 == 0)],
                1000 + i * 1000,
                &mut f,
            );
            for event in &out.events {
                assert!(event.id > last_id);
                last_id = event.id;
            }
            state = out.next_state;
        }
    }

    #[test]
    fn test_audio_sid_survives_projection() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        let out = run_snapshot(&mut detector, &state, &[hand_tile(false)], 1000, &mut f);
        state = out.next_state;

        // Externally linked audio stream
        state
            .vids
            .get_mut(&Vid::from_index(1))
            .unwrap()
            .audio_sid = Some(crate::types::AudioSid::new("sid-7"));

        let out = run_snapshot(&mut detector, &state, &[hand_tile(false)], 2000, &mut f);
        assert_eq!(
            out.next_state.vids[&Vid::from_index(1)]
                .audio_sid
                .as_ref()
                .unwrap()
                .as_str(),
            "sid-7"
        );
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut detector = DeltaDetector::with_defaults();
        let mut f = factory();
        let mut state = VisualState::new();

        for i in 0..3u64 {
            let out = run_snapshot(&mut detector, &state, &[hand_tile(true)], 1000 + i * 1000, &mut f);
            state = out.next_state;
        }
        detector.reset();
        f.reset();

        let out = run_snapshot(&mut detector, &VisualState::new(), &[hand_tile(false)], 1000, &mut f);
        assert_eq!(out.events[0].id, 1);
        assert_eq!(out.next_state.vids.keys().next(), Some(&Vid::from_index(1)));
    }
}
