//! One-owner orchestration of the full visual-delta cycle.
//!
//! ```text
//! regions ─► DeltaDetector ─► events, next state
//!                 │
//!                 ▼
//!          AdPolicyGate.select ─► pending queue
//!                 │
//!     tick: should_speak(audio)
//!                 │
//!                 ▼
//!            Verbalizer ─► spoken line (to TTS, external)
//! ```
//!
//! The pipeline is tick-driven by the caller: ingest one snapshot per tick,
//! poll for a speech line whenever the player is ready. No internal timers,
//! no shared state, no locks.

use std::sync::Arc;

use tracing::debug;

use crate::events::{EventFactory, SessionId, VisualEvent};
use crate::metrics::PipelineMetrics;
use crate::sightline_delta::{DeltaConfig, DeltaDetector};
use crate::sightline_policy::{AdPolicyGate, AudioActivity, PolicyConfig};
use crate::sightline_speech::{LineOrigin, LlmHandler, SpeechConfig, SpokenLine, Verbalizer};
use crate::state::VisualState;
use crate::types::{DetectedRegion, LayoutType};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the full pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub detector: DeltaConfig,
    pub policy: PolicyConfig,
    pub speech: SpeechConfig,
}

// ============================================================================
// INPUT
// ============================================================================

/// One snapshot tick's worth of input.
#[derive(Debug, Clone)]
pub struct SnapshotFrame {
    pub ts_obs_ms: u64,
    pub content_hash: String,
    pub width: u32,
    pub height: u32,
    pub regions: Vec<DetectedRegion>,
    pub layout: LayoutType,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Owns one session's tracker, detector, gate, verbalizer, and world model.
pub struct VisualPipeline {
    detector: DeltaDetector,
    gate: AdPolicyGate,
    verbalizer: Verbalizer,
    factory: EventFactory,
    state: VisualState,
    metrics: PipelineMetrics,
    last_events: Vec<VisualEvent>,
}

impl VisualPipeline {
    /// Creates a pipeline for a fresh session.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            detector: DeltaDetector::new(config.detector),
            gate: AdPolicyGate::new(config.policy),
            verbalizer: Verbalizer::new(config.speech),
            factory: EventFactory::new(SessionId::new()),
            state: VisualState::new(),
            metrics: PipelineMetrics::new(),
            last_events: Vec::new(),
        }
    }

    /// Creates a pipeline with default configuration everywhere.
    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// Installs an LLM line composer on the verbalizer.
    pub fn with_llm_handler(mut self, handler: Arc<dyn LlmHandler>) -> Self {
        self.verbalizer = Verbalizer::new(self.verbalizer.config().clone()).with_handler(handler);
        self
    }

    // ========================================================================
    // SNAPSHOT TICK
    // ========================================================================

    /// Runs one full cycle for a snapshot and returns the emitted events.
    ///
    /// The frame's observation time doubles as the pipeline clock for this
    /// tick; the caller owns the tick cadence.
    pub fn ingest_snapshot(&mut self, frame: &SnapshotFrame) -> &[VisualEvent] {
        let output = self.detector.compute_deltas(
            &self.state,
            &frame.regions,
            frame.layout,
            frame.ts_obs_ms,
            &frame.content_hash,
            frame.width,
            frame.height,
            &mut self.factory,
        );

        self.metrics.record_snapshot();
        self.metrics.record_skipped_regions(output.skipped_regions);
        for event in &output.events {
            self.metrics.record_event(event.event_type());
        }

        let candidates = self.gate.select_candidates(&output.events, frame.ts_obs_ms);
        self.metrics.record_admitted(candidates.len());
        let dropped = self.gate.queue_announcements(candidates);
        self.metrics.record_dropped(dropped);

        debug!(
            session = %self.factory.session(),
            events = output.events.len(),
            pending = self.gate.pending_len(),
            "snapshot ingested"
        );

        self.state = output.next_state;
        self.last_events = output.events;
        &self.last_events
    }

    // ========================================================================
    // SPEECH TICK
    // ========================================================================

    /// Pops and renders the next announcement, if one may be spoken now.
    ///
    /// Suspends only when an LLM handler is configured.
    pub async fn next_speech_line(
        &mut self,
        now_ms: u64,
        audio: Option<&AudioActivity>,
    ) -> Option<SpokenLine> {
        if !self.gate.should_speak(now_ms, audio) {
            return None;
        }
        let allowed = self.gate.next_announcement(now_ms)?;
        let line = self.verbalizer.verbalize(&allowed.event, &self.state).await;
        if let Some(line) = &line {
            if line.origin == LineOrigin::LlmFallback {
                self.metrics.record_llm_fallback();
            }
            self.metrics.record_spoken();
        }
        line
    }

    // ========================================================================
    // ACCESSORS / LIFECYCLE
    // ========================================================================

    pub fn state(&self) -> &VisualState {
        &self.state
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn session(&self) -> SessionId {
        self.factory.session()
    }

    pub fn pending_announcements(&self) -> usize {
        self.gate.pending_len()
    }

    /// Events emitted by the most recent snapshot tick.
    pub fn last_events(&self) -> &[VisualEvent] {
        &self.last_events
    }

    /// Restores every component to its initial state under a new session.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.gate.reset();
        self.factory.reset();
        self.state = VisualState::new();
        self.metrics = PipelineMetrics::new();
        self.last_events.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use crate::types::{BBox, RegionKind, RegionSignals};

    fn frame(regions: Vec<DetectedRegion>, ts_obs_ms: u64) -> SnapshotFrame {
        SnapshotFrame {
            ts_obs_ms,
            content_hash: "00000000".to_string(),
            width: 640,
            height: 360,
            regions,
            layout: LayoutType::Grid,
        }
    }

    fn hand_tile(raised: bool) -> DetectedRegion {
        DetectedRegion {
            bbox: BBox::new(0.0, 0.0, 0.5, 0.5),
            kind: RegionKind::Tile,
            fingerprint: "POS:0055".to_string(),
            signals: RegionSignals {
                hand_raised: Some(raised),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_full_cycle_speaks_hand_raise() {
        let mut pipeline = VisualPipeline::with_defaults();

        pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 1000));
        let events = pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 2000));
        assert!(events
            .iter()
            .any(|e| e.event_type() == EventType::HandRaised));

        let line = pipeline.next_speech_line(2000, None).await;
        assert!(line.is_some());
        let line = line.unwrap();
        assert_eq!(line.origin, LineOrigin::Template);
        assert_eq!(line.text, "Participant top left raised their hand");
        assert_eq!(pipeline.metrics().announcements_spoken, 1);
    }

    #[tokio::test]
    async fn test_nothing_to_speak_when_queue_empty() {
        let mut pipeline = VisualPipeline::with_defaults();
        let mut first = frame(vec![hand_tile(false)], 1000);
        first.layout = LayoutType::Unknown;
        pipeline.ingest_snapshot(&first);
        // The appearance is the only admitted candidate; drain it first
        assert!(pipeline.next_speech_line(1000, None).await.is_some());
        assert!(pipeline.next_speech_line(60_000, None).await.is_none());
    }

    #[tokio::test]
    async fn test_queue_bound_holds_under_event_bursts() {
        let mut pipeline = VisualPipeline::with_defaults();

        // Nine tiles joining at once admits nine vid_appeared candidates
        let tiles: Vec<DetectedRegion> = (0..3)
            .flat_map(|r| {
                (0..3).map(move |c| {
                    let bbox = BBox::new(c as f64 / 3.0, r as f64 / 3.0, 0.3, 0.3);
                    DetectedRegion::new(bbox, RegionKind::Tile, format!("POS:{}{}33", c * 3, r * 3))
                })
            })
            .collect();

        pipeline.ingest_snapshot(&frame(tiles, 1000));
        assert!(pipeline.pending_announcements() <= 5);
        assert!(pipeline.metrics().announcements_dropped >= 4);
    }

    #[test]
    fn test_reset_starts_a_new_session() {
        let mut pipeline = VisualPipeline::with_defaults();
        let session = pipeline.session();
        pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 1000));
        assert!(pipeline.metrics().snapshots > 0);

        pipeline.reset();
        assert_ne!(pipeline.session(), session);
        assert_eq!(pipeline.metrics().snapshots, 0);
        assert!(pipeline.state().vids.is_empty());
        assert_eq!(pipeline.pending_announcements(), 0);

        let events = pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 1000));
        assert_eq!(events[0].id, 1);
    }

    #[tokio::test]
    async fn test_global_cooldown_spaces_announcements() {
        let mut pipeline = VisualPipeline::with_defaults();
        pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 1000));
        pipeline.ingest_snapshot(&frame(vec![hand_tile(true)], 2000));

        // Pending: layout change, appearance, hand raise
        assert!(pipeline.next_speech_line(2000, None).await.is_some());
        assert!(pipeline.next_speech_line(2500, None).await.is_none());
        assert!(pipeline.next_speech_line(4100, None).await.is_some());
    }
}
