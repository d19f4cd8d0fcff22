//! Ground truth oracle for simulation.
//!
//! The oracle maintains the "God's eye view" of a synthetic meeting:
//! - Who is present, whose hand is truly up, who is truly presenting
//! - Edge counters for every true transition (the expected event counts)
//! - Noisy observation rendering: bbox jitter and isolated signal flicker
//!
//! Observations are rendered from a seeded RNG so every run is reproducible
//! from its seed.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sightline_core::fingerprint::generate_fingerprint;
use sightline_core::types::{BBox, DetectedRegion, LayoutType, RegionKind, RegionSignals};

/// Tile colors assigned round-robin at join time.
const TILE_COLORS: &[&str] = &[
    "4a6fa5", "a54a4a", "4aa56f", "a5a04a", "6f4aa5", "4aa5a0", "a56f4a", "8a8a8a", "3a3a6f",
];

/// Noise model for rendered observations.
#[derive(Debug, Clone, Copy)]
pub struct OracleConfig {
    /// Uniform bbox origin jitter per observation, in frame units
    pub bbox_jitter: f64,

    /// Probability of a one-tick false hand reading per participant.
    /// Flickers are kept isolated (never two within consecutive ticks for
    /// the same participant), so a correct debounce must suppress them all.
    pub flicker_prob: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            bbox_jitter: 0.005,
            flicker_prob: 0.0,
        }
    }
}

/// One ground-truth participant.
#[derive(Debug, Clone)]
struct Participant {
    slot: usize,
    present: bool,
    hand_up: bool,
    presenting: bool,
    color: String,
    last_flicker_tick: Option<u64>,
}

/// Ground-truth edge counters: what a perfect detector would emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthCounters {
    pub joins: u64,
    pub leaves: u64,
    pub hand_raises: u64,
    pub hand_lowers: u64,
    pub share_starts: u64,
    pub share_stops: u64,
    pub slide_changes: u64,
    pub layout_changes: u64,
}

/// The oracle - maintains ground truth and renders observations.
pub struct MeetingOracle {
    rng: ChaCha8Rng,
    config: OracleConfig,
    participants: Vec<Participant>,
    slide: Option<String>,
    layout: LayoutType,
    tick: u64,
    pub truth: TruthCounters,
}

impl MeetingOracle {
    /// Creates an oracle seeded for reproducibility.
    pub fn new(seed: u64, config: OracleConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            participants: Vec::new(),
            slide: None,
            layout: LayoutType::Unknown,
            tick: 0,
            truth: TruthCounters::default(),
        }
    }

    // ========================================================================
    // GROUND-TRUTH MUTATIONS
    // ========================================================================

    /// Adds a participant in the next free 3x3 grid slot; returns its index.
    ///
    /// Slots are never reused, so departed tiles cannot be confused with
    /// new arrivals.
    pub fn join(&mut self) -> usize {
        let slot = self.participants.len();
        assert!(slot < 9, "grid is full");
        let color = TILE_COLORS[slot % TILE_COLORS.len()].to_string();
        self.participants.push(Participant {
            slot,
            present: true,
            hand_up: false,
            presenting: false,
            color,
            last_flicker_tick: None,
        });
        self.truth.joins += 1;
        slot
    }

    /// Permanently removes a participant.
    pub fn leave(&mut self, index: usize) {
        let participant = &mut self.participants[index];
        if participant.present {
            participant.present = false;
            if participant.presenting {
                participant.presenting = false;
                self.slide = None;
                self.truth.share_stops += 1;
            }
            self.truth.leaves += 1;
        }
    }

    pub fn raise_hand(&mut self, index: usize) {
        let participant = &mut self.participants[index];
        if participant.present && !participant.hand_up {
            participant.hand_up = true;
            self.truth.hand_raises += 1;
        }
    }

    pub fn lower_hand(&mut self, index: usize) {
        let participant = &mut self.participants[index];
        if participant.present && participant.hand_up {
            participant.hand_up = false;
            self.truth.hand_lowers += 1;
        }
    }

    /// Starts a share by the given participant. The first slide is part of
    /// the share start, not a slide change.
    pub fn start_share(&mut self, index: usize, slide: &str) {
        let participant = &mut self.participants[index];
        if participant.present && !participant.presenting {
            participant.presenting = true;
            self.slide = Some(slide.to_string());
            self.truth.share_starts += 1;
        }
    }

    /// Advances the current share to a new slide.
    pub fn change_slide(&mut self, slide: &str) {
        if self.participants.iter().any(|p| p.present && p.presenting)
            && self.slide.as_deref() != Some(slide)
        {
            self.slide = Some(slide.to_string());
            self.truth.slide_changes += 1;
        }
    }

    /// Stops the current share.
    pub fn stop_share(&mut self) {
        for participant in &mut self.participants {
            if participant.present && participant.presenting {
                participant.presenting = false;
                self.truth.share_stops += 1;
            }
        }
        self.slide = None;
    }

    pub fn set_layout(&mut self, layout: LayoutType) {
        if layout != LayoutType::Unknown && layout != self.layout {
            self.layout = layout;
            self.truth.layout_changes += 1;
        }
    }

    // ========================================================================
    // OBSERVATION RENDERING
    // ========================================================================

    /// Base bbox of a grid slot: a third of the frame with a small margin.
    fn slot_bbox(slot: usize) -> BBox {
        let col = (slot % 3) as f64;
        let row = (slot / 3) as f64;
        BBox::new(col / 3.0 + 0.02, row / 3.0 + 0.02, 1.0 / 3.0 - 0.04, 1.0 / 3.0 - 0.04)
    }

    /// Renders one snapshot's regions and the detected layout.
    ///
    /// Advances the oracle clock by one tick. Regions come out in a stable
    /// order (join order). Fingerprints are rendered from the un-jittered
    /// slot bbox, so a stationary tile keeps a stable fingerprint.
    pub fn observe(&mut self) -> (Vec<DetectedRegion>, LayoutType) {
        let tick = self.tick;
        self.tick += 1;

        let jitter = self.config.bbox_jitter;
        let flicker_prob = self.config.flicker_prob;
        let slide = self.slide.clone();

        let mut regions = Vec::new();
        for participant in &mut self.participants {
            if !participant.present {
                continue;
            }

            let base = Self::slot_bbox(participant.slot);
            let dx = if jitter > 0.0 { self.rng.gen_range(-jitter..=jitter) } else { 0.0 };
            let dy = if jitter > 0.0 { self.rng.gen_range(-jitter..=jitter) } else { 0.0 };
            let bbox = BBox::new(
                (base.x + dx).clamp(0.0, 1.0 - base.w),
                (base.y + dy).clamp(0.0, 1.0 - base.h),
                base.w,
                base.h,
            );

            // Isolated flicker: at most one false reading, then at least one
            // clean tick, so a 2-deep debounce provably suppresses it
            let mut hand_reading = participant.hand_up;
            let may_flicker = participant
                .last_flicker_tick
                .map_or(true, |last| tick >= last + 2);
            if flicker_prob > 0.0 && may_flicker && self.rng.gen_bool(flicker_prob) {
                hand_reading = !hand_reading;
                participant.last_flicker_tick = Some(tick);
            }

            let signals = RegionSignals {
                hand_raised: Some(hand_reading),
                camera_on: Some(true),
                is_active_speaker: None,
                is_presenting: Some(participant.presenting),
                slide_hash: if participant.presenting { slide.clone() } else { None },
            };

            regions.push(DetectedRegion {
                bbox,
                kind: RegionKind::Tile,
                fingerprint: generate_fingerprint(&base, Some(&participant.color)),
                signals,
            });
        }

        (regions, self.layout)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn present_count(&self) -> usize {
        self.participants.iter().filter(|p| p.present).count()
    }

    pub fn hands_up(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.present && p.hand_up)
            .count()
    }

    pub fn share_active(&self) -> bool {
        self.participants.iter().any(|p| p.present && p.presenting)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_is_reproducible_from_seed() {
        let render = |seed: u64| {
            let mut oracle = MeetingOracle::new(
                seed,
                OracleConfig {
                    bbox_jitter: 0.01,
                    flicker_prob: 0.1,
                },
            );
            oracle.join();
            oracle.join();
            let mut all = Vec::new();
            for _ in 0..20 {
                let (regions, _) = oracle.observe();
                all.push(regions);
            }
            all
        };
        assert_eq!(render(42), render(42));
    }

    #[test]
    fn test_edge_counters_track_ground_truth() {
        let mut oracle = MeetingOracle::new(1, OracleConfig::default());
        let a = oracle.join();
        let b = oracle.join();
        oracle.raise_hand(a);
        oracle.raise_hand(a); // idempotent
        oracle.lower_hand(a);
        oracle.start_share(b, "s1");
        oracle.change_slide("s1"); // same slide, no edge
        oracle.change_slide("s2");
        oracle.stop_share();
        oracle.leave(b);

        assert_eq!(oracle.truth.joins, 2);
        assert_eq!(oracle.truth.hand_raises, 1);
        assert_eq!(oracle.truth.hand_lowers, 1);
        assert_eq!(oracle.truth.share_starts, 1);
        assert_eq!(oracle.truth.share_stops, 1);
        assert_eq!(oracle.truth.slide_changes, 1);
        assert_eq!(oracle.truth.leaves, 1);
    }

    #[test]
    fn test_departing_presenter_counts_share_stop() {
        let mut oracle = MeetingOracle::new(1, OracleConfig::default());
        let a = oracle.join();
        oracle.start_share(a, "s1");
        oracle.leave(a);
        assert_eq!(oracle.truth.share_stops, 1);
        assert!(!oracle.share_active());
    }

    #[test]
    fn test_flickers_are_isolated() {
        let mut oracle = MeetingOracle::new(
            7,
            OracleConfig {
                bbox_jitter: 0.0,
                flicker_prob: 0.5,
            },
        );
        oracle.join();

        let mut last_flicker: Option<u64> = None;
        for tick in 0..200u64 {
            let (regions, _) = oracle.observe();
            // Ground truth hand is always down; a true reading is a flicker
            if regions[0].signals.hand_raised == Some(true) {
                if let Some(last) = last_flicker {
                    assert!(tick >= last + 2, "flicker at {} too close to {}", tick, last);
                }
                last_flicker = Some(tick);
            }
        }
        assert!(last_flicker.is_some(), "expected at least one flicker");
    }

    #[test]
    fn test_rendered_bboxes_stay_valid() {
        let mut oracle = MeetingOracle::new(
            3,
            OracleConfig {
                bbox_jitter: 0.05,
                flicker_prob: 0.0,
            },
        );
        for _ in 0..9 {
            oracle.join();
        }
        for _ in 0..50 {
            let (regions, _) = oracle.observe();
            for region in &regions {
                assert!(region.bbox.is_valid(), "invalid bbox: {:?}", region.bbox);
            }
        }
    }
}
