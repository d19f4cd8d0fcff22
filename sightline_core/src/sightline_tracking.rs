//! The "TRACKING" Engine - Region Continuity Layer
//!
//! Answers "is this the same region as before?" without ever inferring
//! identity, using:
//! - Center-distance gating in the normalized frame
//! - Fingerprint similarity gating (position buckets + average color)
//! - Deterministic best-match selection with stable tie-breaking
//!
//! This module implements the 3-stage pipeline:
//! 1. Candidate Gating (distance + similarity thresholds, kind must match)
//! 2. Best-Match Selection (maximum combined score, earliest handle on ties)
//! 3. Lifecycle (mint new handles, expire stale ones)

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fingerprint::hash_similarity;
use crate::types::{BBox, DetectedRegion, RegionKind, Vid};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the VidTracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Milliseconds without observation before an unmatched handle expires
    /// (default: 15000)
    pub expire_ms: u64,

    /// Maximum center distance for a candidate match, in normalized frame
    /// units (default: 0.15)
    pub bbox_distance_threshold: f64,

    /// Minimum fingerprint similarity for a candidate match (default: 0.6)
    pub fingerprint_similarity_threshold: f64,

    /// Weight of the distance component in the combined score; the
    /// remainder goes to fingerprint similarity (default: 0.4)
    pub bbox_weight: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            expire_ms: 15_000,
            bbox_distance_threshold: 0.15,
            fingerprint_similarity_threshold: 0.6,
            bbox_weight: 0.4,
        }
    }
}

// ============================================================================
// TRACKED ENTRY (Internal State)
// ============================================================================

/// Tracker-owned record of one live continuity handle.
///
/// `kind` is immutable for the entry's lifetime: a region of a different
/// kind can never match this entry, no matter how close it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VidEntry {
    pub vid: Vid,
    pub bbox: BBox,
    pub kind: RegionKind,
    pub fingerprint: String,
    pub last_seen_ms: u64,
    pub confidence: f64,
}

// ============================================================================
// PER-CALL REPORT (Output)
// ============================================================================

/// One region→handle assignment from a `process_regions` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAssignment {
    /// Index of the region in the input slice
    pub region_index: usize,

    /// Handle the region was assigned to
    pub vid: Vid,
}

/// Result of one `process_regions` call.
///
/// Every valid input region appears in `assignments` exactly once, and its
/// handle is in either `appeared` or `updated`, never both.
#[derive(Debug, Clone, Default)]
pub struct TrackReport {
    pub assignments: Vec<RegionAssignment>,
    pub appeared: Vec<Vid>,
    pub updated: Vec<Vid>,
    pub expired: Vec<Vid>,

    /// Regions dropped for failing bbox validation
    pub skipped_regions: usize,
}

// ============================================================================
// VID TRACKER (The Engine)
// ============================================================================

/// The continuity matching engine.
///
/// Maintains the handle table by:
/// 1. Gating each input region against live entries of equal kind
/// 2. Claiming the best-scoring unclaimed entry, or minting a new handle
/// 3. Expiring entries unseen for longer than `expire_ms`
///
/// Entries live in a `BTreeMap` keyed by mint-ordered handles, so candidate
/// iteration and tie-breaking are deterministic.
pub struct VidTracker {
    /// Runtime configuration
    config: TrackerConfig,

    /// Next handle index; handles are 1-based and never reused
    next_handle: u32,

    /// All live entries, keyed by handle
    entries: BTreeMap<Vid, VidEntry>,
}

impl VidTracker {
    /// Creates a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            next_handle: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Creates a new tracker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TrackerConfig::default())
    }

    // ========================================================================
    // MATCHING
    // ========================================================================

    /// Scores a candidate entry against a region.
    ///
    /// Returns `None` when either gate rejects: center distance above
    /// `bbox_distance_threshold`, or fingerprint similarity below
    /// `fingerprint_similarity_threshold`. Kind mismatches are filtered by
    /// the caller before scoring.
    fn score_candidate(&self, entry: &VidEntry, region: &DetectedRegion) -> Option<f64> {
        let distance = entry.bbox.center_distance(&region.bbox);
        if distance > self.config.bbox_distance_threshold {
            return None;
        }

        let similarity = hash_similarity(&entry.fingerprint, &region.fingerprint);
        if similarity < self.config.fingerprint_similarity_threshold {
            return None;
        }

        let w = self.config.bbox_weight;
        Some(w * (1.0 - distance / self.config.bbox_distance_threshold) + (1.0 - w) * similarity)
    }

    /// Processes one snapshot's regions against the handle table.
    ///
    /// For each region in input order, the best-scoring live entry of equal
    /// kind that has not yet been claimed in this call is reused; otherwise
    /// a new handle is minted. After all regions are processed, unclaimed
    /// entries older than `expire_ms` are removed. Unclaimed entries still
    /// within the expiry window remain and may match a later snapshot.
    ///
    /// Regions with an invalid bbox are skipped (warned and counted), never
    /// an error.
    pub fn process_regions(&mut self, regions: &[DetectedRegion], now_ms: u64) -> TrackReport {
        let mut report = TrackReport::default();
        let mut claimed: BTreeSet<Vid> = BTreeSet::new();

        for (region_index, region) in regions.iter().enumerate() {
            if !region.bbox.is_valid() {
                warn!(region_index, bbox = ?region.bbox, "skipping region with invalid bbox");
                report.skipped_regions += 1;
                continue;
            }

            // Stage 1 + 2: gate and select. Strictly-greater comparison
            // keeps the earliest handle on score ties.
            let mut best: Option<(Vid, f64)> = None;
            for (vid, entry) in &self.entries {
                if claimed.contains(vid) || entry.kind != region.kind {
                    continue;
                }
                if let Some(score) = self.score_candidate(entry, region) {
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((*vid, score));
                    }
                }
            }

            // Stage 3: reuse or mint
            match best {
                Some((vid, score)) => {
                    if let Some(entry) = self.entries.get_mut(&vid) {
                        entry.bbox = region.bbox;
                        entry.fingerprint = region.fingerprint.clone();
                        entry.last_seen_ms = now_ms;
                        entry.confidence = score;
                    }
                    claimed.insert(vid);
                    report.updated.push(vid);
                    report.assignments.push(RegionAssignment { region_index, vid });
                }
                None => {
                    let vid = Vid::from_index(self.next_handle);
                    self.next_handle += 1;
                    self.entries.insert(
                        vid,
                        VidEntry {
                            vid,
                            bbox: region.bbox,
                            kind: region.kind,
                            fingerprint: region.fingerprint.clone(),
                            last_seen_ms: now_ms,
                            confidence: 1.0,
                        },
                    );
                    claimed.insert(vid);
                    report.appeared.push(vid);
                    report.assignments.push(RegionAssignment { region_index, vid });
                }
            }
        }

        // Expiry: unclaimed entries last seen strictly before the cutoff go.
        // Survivors always satisfy last_seen_ms >= now_ms - expire_ms.
        let cutoff = now_ms.saturating_sub(self.config.expire_ms);
        let stale: Vec<Vid> = self
            .entries
            .iter()
            .filter(|(vid, entry)| !claimed.contains(vid) && entry.last_seen_ms < cutoff)
            .map(|(vid, _)| *vid)
            .collect();
        for vid in stale {
            self.entries.remove(&vid);
            report.expired.push(vid);
        }

        report
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Gets a live entry by handle.
    pub fn get_entry(&self, vid: &Vid) -> Option<&VidEntry> {
        self.entries.get(vid)
    }

    /// Iterates all live entries in handle order.
    pub fn entries(&self) -> impl Iterator<Item = &VidEntry> {
        self.entries.values()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionSignals;

    fn tile(x: f64, y: f64, fingerprint: &str) -> DetectedRegion {
        DetectedRegion {
            bbox: BBox::new(x, y, 0.5, 0.5),
            kind: RegionKind::Tile,
            fingerprint: fingerprint.to_string(),
            signals: RegionSignals::default(),
        }
    }

    #[test]
    fn test_empty_call_is_noop() {
        let mut tracker = VidTracker::with_defaults();
        let report = tracker.process_regions(&[], 1000);
        assert!(report.assignments.is_empty());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_first_region_mints_v1() {
        let mut tracker = VidTracker::with_defaults();
        let report = tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        assert_eq!(report.appeared, vec![Vid::from_index(1)]);
        assert!(report.updated.is_empty());
        assert_eq!(report.assignments.len(), 1);
        assert_eq!(report.assignments[0].vid.to_string(), "v1");
        assert_eq!(tracker.len(), 1);

        let entry = tracker.get_entry(&Vid::from_index(1)).unwrap();
        assert_eq!(entry.confidence, 1.0);
        assert_eq!(entry.last_seen_ms, 1000);
    }

    #[test]
    fn test_drift_within_threshold_reuses_handle() {
        let mut tracker = VidTracker::with_defaults();
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        let drifted = DetectedRegion {
            bbox: BBox::new(0.02, 0.01, 0.5, 0.5),
            ..tile(0.0, 0.0, "POS:0055")
        };
        let report = tracker.process_regions(&[drifted], 2000);

        assert!(report.appeared.is_empty());
        assert_eq!(report.updated, vec![Vid::from_index(1)]);
        assert_eq!(tracker.len(), 1);

        let entry = tracker.get_entry(&Vid::from_index(1)).unwrap();
        assert_eq!(entry.last_seen_ms, 2000);
        assert!((entry.bbox.x - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_kind_mismatch_mints_new_handle() {
        let mut tracker = VidTracker::with_defaults();
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        let share = DetectedRegion {
            kind: RegionKind::ScreenShare,
            ..tile(0.0, 0.0, "POS:0055")
        };
        let report = tracker.process_regions(&[share], 2000);

        assert_eq!(report.appeared, vec![Vid::from_index(2)]);
        assert_eq!(tracker.len(), 2);
        // Kind is immutable on the surviving entry
        assert_eq!(tracker.get_entry(&Vid::from_index(1)).unwrap().kind, RegionKind::Tile);
    }

    #[test]
    fn test_distant_region_mints_new_handle() {
        let mut tracker = VidTracker::with_defaults();
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        let far = DetectedRegion {
            bbox: BBox::new(0.5, 0.5, 0.5, 0.5),
            ..tile(0.0, 0.0, "POS:0055")
        };
        let report = tracker.process_regions(&[far], 2000);
        assert_eq!(report.appeared, vec![Vid::from_index(2)]);
    }

    #[test]
    fn test_expiry_after_window() {
        let mut tracker = VidTracker::new(TrackerConfig {
            expire_ms: 5000,
            ..Default::default()
        });
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        // Still inside the window at t=5000: survives
        let report = tracker.process_regions(&[], 5000);
        assert!(report.expired.is_empty());
        assert_eq!(tracker.len(), 1);

        // t=7000: 6000ms unseen > 5000ms window
        let report = tracker.process_regions(&[], 7000);
        assert_eq!(report.expired, vec![Vid::from_index(1)]);
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_handles_never_reused_after_expiry() {
        let mut tracker = VidTracker::new(TrackerConfig {
            expire_ms: 1000,
            ..Default::default()
        });
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);
        tracker.process_regions(&[], 10_000);
        assert_eq!(tracker.len(), 0);

        let report = tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 11_000);
        assert_eq!(report.appeared, vec![Vid::from_index(2)]);
    }

    #[test]
    fn test_one_region_per_handle_per_call() {
        let mut tracker = VidTracker::with_defaults();
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        // Two near-identical regions: only one may claim v1
        let report = tracker.process_regions(
            &[tile(0.01, 0.0, "POS:0055"), tile(0.0, 0.01, "POS:0055")],
            2000,
        );
        assert_eq!(report.updated, vec![Vid::from_index(1)]);
        assert_eq!(report.appeared, vec![Vid::from_index(2)]);

        let vids: BTreeSet<Vid> = report.assignments.iter().map(|a| a.vid).collect();
        assert_eq!(vids.len(), report.assignments.len());
    }

    #[test]
    fn test_tie_break_prefers_earliest_handle() {
        let mut tracker = VidTracker::with_defaults();
        // Two entries at the same spot with the same fingerprint
        tracker.process_regions(
            &[tile(0.0, 0.0, "POS:0055"), tile(0.0, 0.0, "POS:0055")],
            1000,
        );

        let report = tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 2000);
        assert_eq!(report.updated, vec![Vid::from_index(1)]);
    }

    #[test]
    fn test_invalid_bbox_skipped_without_panic() {
        let mut tracker = VidTracker::with_defaults();
        let bad = DetectedRegion {
            bbox: BBox::new(f64::NAN, 0.0, 0.5, 0.5),
            ..tile(0.0, 0.0, "POS:0055")
        };
        let report = tracker.process_regions(&[bad, tile(0.0, 0.0, "POS:0055")], 1000);

        assert_eq!(report.skipped_regions, 1);
        assert_eq!(report.assignments.len(), 1);
        assert_eq!(report.assignments[0].region_index, 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_unclaimed_entry_within_window_survives_and_rematches() {
        let mut tracker = VidTracker::with_defaults();
        tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 1000);

        // One empty snapshot: entry unmatched but inside the expiry window
        tracker.process_regions(&[], 2000);
        assert_eq!(tracker.len(), 1);

        // Region comes back: same handle
        let report = tracker.process_regions(&[tile(0.0, 0.0, "POS:0055")], 3000);
        assert_eq!(report.updated, vec![Vid::from_index(1)]);
    }
}
