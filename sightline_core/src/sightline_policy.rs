//! The "POLICY" Engine - Audio-Description Admission Layer
//!
//! Decides which events deserve spoken air time. An event must pass every
//! axis to be spoken:
//! 1. Allowlist (only user-facing transitions qualify)
//! 2. Per-type cooldown (no machine-gun repeats of one transition type)
//! 3. Verbosity filter (minimal mode keeps only the highest priorities)
//! 4. Global cooldown + speech-overlap check at speak time
//! 5. Bounded pending queue (stale announcements are shed, newest kept)

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::events::{EventType, VisualEvent};

/// Window after the last detected speech during which announcements are
/// still held back, in ms.
const RECENT_SPEECH_WINDOW_MS: u64 = 500;

/// Speech-detection confidence above which an active speaker blocks
/// announcements.
const SPEECH_CONFIDENCE_FLOOR: f64 = 0.5;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How much of the event stream gets spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Only the highest-priority transitions (screen share, hand raise)
    Minimal,
    /// Every allowed transition
    Normal,
}

/// Configuration for the AdPolicyGate
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Master switch; when off nothing is ever spoken
    pub enabled: bool,

    pub verbosity: Verbosity,

    /// Hold announcements while someone is talking
    pub avoid_speech_overlap: bool,

    /// Minimum gap between any two announcements (default: 2000)
    pub global_cooldown_ms: u64,

    /// Per-type minimum gap; types absent from the map have no cooldown
    pub event_cooldown_ms: BTreeMap<EventType, u64>,

    /// Upper bound on the pending queue (default: 5)
    pub max_pending_announcements: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let mut event_cooldown_ms = BTreeMap::new();
        event_cooldown_ms.insert(EventType::HandRaised, 5000);
        event_cooldown_ms.insert(EventType::HandLowered, 5000);
        event_cooldown_ms.insert(EventType::SlideChanged, 3000);
        event_cooldown_ms.insert(EventType::LayoutChanged, 10_000);

        Self {
            enabled: true,
            verbosity: Verbosity::Normal,
            avoid_speech_overlap: true,
            global_cooldown_ms: 2000,
            event_cooldown_ms,
            max_pending_announcements: 5,
        }
    }
}

// ============================================================================
// PRIORITIES
// ============================================================================

/// Base announcement priority of an event type.
///
/// Zero means the type is not announceable at all; this doubles as the
/// allowlist. Minimal verbosity keeps priorities 8 and above.
pub fn base_priority(event_type: EventType) -> u8 {
    match event_type {
        EventType::ScreenShareStarted => 10,
        EventType::ScreenShareStopped => 9,
        EventType::HandRaised => 8,
        EventType::SlideChanged => 6,
        EventType::HandLowered => 5,
        EventType::LayoutChanged => 4,
        EventType::VidAppeared => 3,
        EventType::VidDisappeared => 2,
        EventType::SnapshotReceived | EventType::AudioVideoLink | EventType::Unknown => 0,
    }
}

// ============================================================================
// INPUTS / OUTPUTS
// ============================================================================

/// Caller-provided view of the live audio, used for overlap avoidance.
#[derive(Debug, Clone, Copy)]
pub struct AudioActivity {
    pub is_speech_active: bool,

    /// Confidence of the speech detection, in `[0, 1]`
    pub confidence: f64,

    /// When speech was last detected
    pub last_speech_ms: u64,
}

/// An event that passed admission, with its priority at admission time.
#[derive(Debug, Clone)]
pub struct AllowedAdEvent {
    pub event: VisualEvent,
    pub priority: u8,
}

// ============================================================================
// AD POLICY GATE (The Engine)
// ============================================================================

/// Admission controller for spoken announcements.
pub struct AdPolicyGate {
    config: PolicyConfig,

    /// When the last announcement was spoken
    last_announcement_ms: Option<u64>,

    /// When each event type was last spoken
    last_event_type_ms: BTreeMap<EventType, u64>,

    /// Admitted announcements awaiting a speak slot
    pending: VecDeque<AllowedAdEvent>,
}

impl AdPolicyGate {
    /// Creates a new gate with the given configuration.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            last_announcement_ms: None,
            last_event_type_ms: BTreeMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Creates a new gate with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PolicyConfig::default())
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    // ========================================================================
    // ADMISSION
    // ========================================================================

    /// Filters a batch of events down to announcement candidates.
    ///
    /// Applies the allowlist, the per-type cooldown, and the verbosity
    /// filter, then sorts descending by priority (stable, so same-priority
    /// events keep their emission order).
    pub fn select_candidates(&self, events: &[VisualEvent], now_ms: u64) -> Vec<AllowedAdEvent> {
        let mut candidates: Vec<AllowedAdEvent> = events
            .iter()
            .filter_map(|event| {
                let event_type = event.event_type();
                let priority = base_priority(event_type);
                if priority == 0 {
                    return None;
                }

                if let Some(cooldown) = self.config.event_cooldown_ms.get(&event_type) {
                    if let Some(last) = self.last_event_type_ms.get(&event_type) {
                        if now_ms.saturating_sub(*last) < *cooldown {
                            return None;
                        }
                    }
                }

                let floor = match self.config.verbosity {
                    Verbosity::Minimal => 8,
                    Verbosity::Normal => 1,
                };
                if priority < floor {
                    return None;
                }

                Some(AllowedAdEvent {
                    event: event.clone(),
                    priority,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }

    /// Appends candidates to the pending queue, shedding the oldest when the
    /// bound is exceeded.
    ///
    /// Returns how many announcements were shed.
    pub fn queue_announcements(&mut self, candidates: Vec<AllowedAdEvent>) -> usize {
        self.pending.extend(candidates);
        let mut dropped = 0;
        while self.pending.len() > self.config.max_pending_announcements {
            self.pending.pop_front();
            dropped += 1;
        }
        dropped
    }

    // ========================================================================
    // SPEAK TICK
    // ========================================================================

    /// Whether an announcement may be spoken right now.
    ///
    /// Requires the gate enabled, a non-empty queue, and the global cooldown
    /// elapsed. With overlap avoidance on, active speech (above the
    /// confidence floor) or speech within the last 500ms blocks the slot.
    pub fn should_speak(&self, now_ms: u64, audio: Option<&AudioActivity>) -> bool {
        if !self.config.enabled || self.pending.is_empty() {
            return false;
        }

        if let Some(last) = self.last_announcement_ms {
            if now_ms.saturating_sub(last) < self.config.global_cooldown_ms {
                return false;
            }
        }

        if self.config.avoid_speech_overlap {
            if let Some(activity) = audio {
                if activity.is_speech_active && activity.confidence > SPEECH_CONFIDENCE_FLOOR {
                    return false;
                }
                if now_ms.saturating_sub(activity.last_speech_ms) < RECENT_SPEECH_WINDOW_MS {
                    return false;
                }
            }
        }

        true
    }

    /// Pops the highest-priority pending announcement and marks the speak
    /// time for both cooldown axes.
    pub fn next_announcement(&mut self, now_ms: u64) -> Option<AllowedAdEvent> {
        if self.pending.is_empty() {
            return None;
        }

        // Re-sort at pop time: later batches may have queued higher priority
        self.pending
            .make_contiguous()
            .sort_by(|a, b| b.priority.cmp(&a.priority));

        let head = self.pending.pop_front()?;
        self.last_announcement_ms = Some(now_ms);
        self.last_event_type_ms.insert(head.event.event_type(), now_ms);
        Some(head)
    }

    /// Empties the pending queue.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Number of pending announcements.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Restores the gate to its initial state.
    pub fn reset(&mut self) {
        self.last_announcement_ms = None;
        self.last_event_type_ms.clear();
        self.pending.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
