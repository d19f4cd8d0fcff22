//! Replay Auditing - Event-Log / World-Model Agreement
//!
//! The reducer can rebuild the world model from the event log alone. This
//! module records the log as it is produced, folds the reducer over it, and
//! cross-checks the detector-projected state: hand count, screen-share
//! activity, layout, and the live handle set must agree.
//!
//! Used by unit tests and every simulation scenario run.

use std::collections::BTreeSet;

use crate::events::VisualEvent;
use crate::state::{reduce, VisualState};
use crate::types::Vid;

// =============================================================================
// REPORT
// =============================================================================

/// One disagreement between replayed and detector state.
#[derive(Debug, Clone)]
pub struct ReplayMismatch {
    pub field: &'static str,
    pub replayed: String,
    pub detector: String,
}

/// Outcome of one audit.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub events_applied: usize,
    pub mismatches: Vec<ReplayMismatch>,
}

impl ReplayReport {
    pub fn consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

// =============================================================================
// AUDITOR
// =============================================================================

/// Accumulates the session event log and replays it on demand.
#[derive(Debug, Default)]
pub struct ReplayAuditor {
    log: Vec<VisualEvent>,
}

impl ReplayAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one snapshot's events to the log.
    pub fn record(&mut self, events: &[VisualEvent]) {
        self.log.extend_from_slice(events);
    }

    pub fn event_count(&self) -> usize {
        self.log.len()
    }

    /// True when recorded event ids strictly increase.
    pub fn ids_monotonic(&self) -> bool {
        self.log.windows(2).all(|pair| pair[0].id < pair[1].id)
    }

    /// Folds the reducer over the recorded log from the initial state.
    pub fn replayed_state(&self) -> VisualState {
        self.log
            .iter()
            .fold(VisualState::new(), |state, event| reduce(state, event))
    }

    /// Compares the replayed state against the detector's projection.
    pub fn audit(&self, detector_state: &VisualState) -> ReplayReport {
        let replayed = self.replayed_state();
        let mut mismatches = Vec::new();

        if replayed.hand_raised_count != detector_state.hand_raised_count {
            mismatches.push(ReplayMismatch {
                field: "hand_raised_count",
                replayed: replayed.hand_raised_count.to_string(),
                detector: detector_state.hand_raised_count.to_string(),
            });
        }
        if replayed.screen_share.active != detector_state.screen_share.active {
            mismatches.push(ReplayMismatch {
                field: "screen_share.active",
                replayed: replayed.screen_share.active.to_string(),
                detector: detector_state.screen_share.active.to_string(),
            });
        }
        if replayed.layout != detector_state.layout {
            mismatches.push(ReplayMismatch {
                field: "layout",
                replayed: replayed.layout.to_string(),
                detector: detector_state.layout.to_string(),
            });
        }

        let replayed_vids: BTreeSet<Vid> = replayed.vids.keys().copied().collect();
        let detector_vids: BTreeSet<Vid> = detector_state.vids.keys().copied().collect();
        if replayed_vids != detector_vids {
            mismatches.push(ReplayMismatch {
                field: "vids",
                replayed: format!("{:?}", replayed_vids),
                detector: format!("{:?}", detector_vids),
            });
        }

        ReplayReport {
            events_applied: self.log.len(),
            mismatches,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
