//! Scenario runner - drives the full pipeline against the oracle.
//!
//! Each run feeds the oracle's observations through a real
//! [`VisualPipeline`] tick by tick, records the event log, and then checks
//! the pipeline's contracts:
//! - Emitted transition counts equal the oracle's true edge counts
//! - Event ids strictly increase
//! - Replaying the event log through the reducer agrees with the world model
//! - The pending announcement queue never exceeds its bound

use sightline_core::events::EventType;
use sightline_core::fingerprint::content_hash;
use sightline_core::pipeline::{PipelineConfig, SnapshotFrame, VisualPipeline};
use sightline_core::replay::ReplayAuditor;
use sightline_core::sightline_delta::DeltaConfig;
use sightline_core::sightline_tracking::TrackerConfig;
use sightline_core::types::LayoutType;
use tracing::{debug, info};

use crate::oracle::{MeetingOracle, OracleConfig};
use crate::scenarios::ScenarioId;

// =============================================================================
// RESULTS
// =============================================================================

/// Metrics collected during a scenario run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimMetrics {
    /// Total events emitted by the pipeline
    pub events_emitted: u64,

    /// Spoken lines produced
    pub announcements_spoken: u64,

    /// Events recorded for replay
    pub replayed_events: usize,

    /// Largest pending-queue depth observed
    pub max_pending: usize,
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: ScenarioId,
    pub seed: u64,
    pub passed: bool,
    pub total_ticks: u64,
    pub failure_reason: Option<String>,
    pub metrics: SimMetrics,
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    /// Seed for all oracle randomness
    seed: u64,

    /// Wall-clock milliseconds per snapshot tick
    tick_ms: u64,

    /// Ticks per run
    max_ticks: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_ms: 1000,
            max_ticks: 120,
        }
    }

    /// Sets the tick length.
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms.max(1);
        self
    }

    /// Sets the run length.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks.max(10);
        self
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        match scenario {
            ScenarioId::HandRaiseStorm => self.run_hand_raise_storm().await,
            ScenarioId::PresenterHandoff => self.run_presenter_handoff().await,
            ScenarioId::TileChurn => self.run_tile_churn().await,
            ScenarioId::DriftField => self.run_drift_field().await,
            ScenarioId::FlickerNoise => self.run_flicker_noise().await,
        }
    }

    // =========================================================================
    // DRIVE LOOP
    // =========================================================================

    /// Feeds the pipeline one observed snapshot per tick, applying the
    /// scenario's schedule just before each observation.
    async fn drive<F>(
        &self,
        pipeline: &mut VisualPipeline,
        oracle: &mut MeetingOracle,
        auditor: &mut ReplayAuditor,
        ticks: u64,
        mut schedule: F,
    ) -> (u64, usize)
    where
        F: FnMut(u64, &mut MeetingOracle),
    {
        let mut spoken = 0u64;
        let mut max_pending = 0usize;

        for tick in 0..ticks {
            schedule(tick, oracle);
            let (regions, layout) = oracle.observe();
            let now_ms = 1_000 + tick * self.tick_ms;

            let frame = SnapshotFrame {
                ts_obs_ms: now_ms,
                content_hash: content_hash(&format!("{}:{}", tick, regions.len())),
                width: 640,
                height: 360,
                regions,
                layout,
            };
            let events = pipeline.ingest_snapshot(&frame);
            auditor.record(events);

            max_pending = max_pending.max(pipeline.pending_announcements());
            if pipeline.next_speech_line(now_ms, None).await.is_some() {
                spoken += 1;
            }

            if tick % 30 == 0 {
                debug!(
                    "  t={}s | tiles={} | hands={} | pending={}",
                    tick,
                    oracle.present_count(),
                    oracle.hands_up(),
                    pipeline.pending_announcements()
                );
            }
        }

        (spoken, max_pending)
    }

    // =========================================================================
    // SHARED CHECKS
    // =========================================================================

    /// Compares pipeline output against the oracle's ground truth and the
    /// replayed event log.
    #[allow(clippy::too_many_arguments)]
    fn check(
        &self,
        scenario: ScenarioId,
        total_ticks: u64,
        oracle: &MeetingOracle,
        pipeline: &VisualPipeline,
        auditor: &ReplayAuditor,
        spoken: u64,
        max_pending: usize,
        mut failures: Vec<String>,
    ) -> ScenarioResult {
        let metrics = pipeline.metrics();
        let truth = oracle.truth;

        let expectations = [
            (EventType::VidAppeared, truth.joins),
            (EventType::VidDisappeared, truth.leaves),
            (EventType::HandRaised, truth.hand_raises),
            (EventType::HandLowered, truth.hand_lowers),
            (EventType::ScreenShareStarted, truth.share_starts),
            (EventType::ScreenShareStopped, truth.share_stops),
            (EventType::SlideChanged, truth.slide_changes),
            (EventType::LayoutChanged, truth.layout_changes),
        ];
        for (event_type, expected) in expectations {
            let emitted = metrics.events_of(event_type);
            if emitted != expected {
                failures.push(format!(
                    "{}: emitted {} but ground truth has {} edges",
                    event_type, emitted, expected
                ));
            }
        }

        if !auditor.ids_monotonic() {
            failures.push("event ids are not strictly increasing".to_string());
        }

        let report = auditor.audit(pipeline.state());
        if !report.consistent() {
            for mismatch in &report.mismatches {
                failures.push(format!(
                    "replay disagreement on {}: replayed={} detector={}",
                    mismatch.field, mismatch.replayed, mismatch.detector
                ));
            }
        }

        let queue_bound = 5;
        if max_pending > queue_bound {
            failures.push(format!(
                "pending queue reached {} (bound {})",
                max_pending, queue_bound
            ));
        }

        let passed = failures.is_empty();
        if passed {
            info!(
                "✓ {} complete: {} events, {} spoken, replay consistent",
                scenario.name(),
                metrics.events_total,
                spoken
            );
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks,
            failure_reason: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
            metrics: SimMetrics {
                events_emitted: metrics.events_total,
                announcements_spoken: spoken,
                replayed_events: auditor.event_count(),
                max_pending,
            },
        }
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    /// SIM-001: Staggered raises and lowers across a full grid.
    ///
    /// Every raise persists 3 ticks before the lower, comfortably past the
    /// 2-snapshot debounce, so emitted counts must equal true edge counts
    /// exactly.
    async fn run_hand_raise_storm(&self) -> ScenarioResult {
        let mut pipeline = VisualPipeline::with_defaults();
        let mut oracle = MeetingOracle::new(self.seed, OracleConfig::default());
        let mut auditor = ReplayAuditor::new();
        let ticks = self.max_ticks.max(80);

        let (spoken, max_pending) = self
            .drive(&mut pipeline, &mut oracle, &mut auditor, ticks, |tick, oracle| {
                if tick == 0 {
                    for _ in 0..9 {
                        oracle.join();
                    }
                    oracle.set_layout(LayoutType::Grid);
                }
                // Participant i raises at 10 + 7i, lowers 3 ticks later;
                // keep the last lower at least 3 ticks before the run ends
                for i in 0..9u64 {
                    let raise_at = 10 + i * 7;
                    if raise_at + 6 < ticks {
                        if tick == raise_at {
                            oracle.raise_hand(i as usize);
                        }
                        if tick == raise_at + 3 {
                            oracle.lower_hand(i as usize);
                        }
                    }
                }
            })
            .await;

        let mut failures = Vec::new();
        if oracle.truth.hand_raises == 0 {
            failures.push("schedule produced no raises; run too short".to_string());
        }
        if spoken == 0 {
            failures.push("no announcement was ever spoken".to_string());
        }
        self.check(
            ScenarioId::HandRaiseStorm,
            ticks,
            &oracle,
            &pipeline,
            &auditor,
            spoken,
            max_pending,
            failures,
        )
    }

    /// SIM-002: Share start, slide advances, handoff to a second presenter.
    async fn run_presenter_handoff(&self) -> ScenarioResult {
        let mut pipeline = VisualPipeline::with_defaults();
        let mut oracle = MeetingOracle::new(self.seed, OracleConfig::default());
        let mut auditor = ReplayAuditor::new();
        let ticks = self.max_ticks.max(90);

        let (spoken, max_pending) = self
            .drive(&mut pipeline, &mut oracle, &mut auditor, ticks, |tick, oracle| {
                match tick {
                    0 => {
                        for _ in 0..3 {
                            oracle.join();
                        }
                        oracle.set_layout(LayoutType::Grid);
                    }
                    10 => {
                        oracle.start_share(0, "slide-01");
                        oracle.set_layout(LayoutType::Presentation);
                    }
                    20 => oracle.change_slide("slide-02"),
                    30 => oracle.change_slide("slide-03"),
                    40 => oracle.change_slide("slide-04"),
                    50 => oracle.stop_share(),
                    55 => oracle.start_share(1, "deck-b-01"),
                    65 => oracle.change_slide("deck-b-02"),
                    _ => {}
                }
            })
            .await;

        let mut failures = Vec::new();
        if !pipeline.state().screen_share.active {
            failures.push("share should be active at run end".to_string());
        }
        self.check(
            ScenarioId::PresenterHandoff,
            ticks,
            &oracle,
            &pipeline,
            &auditor,
            spoken,
            max_pending,
            failures,
        )
    }

    /// SIM-003: Joins and permanent leaves under a short expiry window.
    async fn run_tile_churn(&self) -> ScenarioResult {
        let config = PipelineConfig {
            detector: DeltaConfig {
                debounce_snapshots: 2,
                tracker: TrackerConfig {
                    // Short window so departures resolve within the run
                    expire_ms: 3 * self.tick_ms,
                    ..Default::default()
                },
            },
            ..Default::default()
        };
        let mut pipeline = VisualPipeline::new(config);
        let mut oracle = MeetingOracle::new(self.seed, OracleConfig::default());
        let mut auditor = ReplayAuditor::new();
        let ticks = self.max_ticks.max(60);

        let (spoken, max_pending) = self
            .drive(&mut pipeline, &mut oracle, &mut auditor, ticks, |tick, oracle| {
                match tick {
                    0 => {
                        oracle.join();
                        oracle.join();
                        oracle.set_layout(LayoutType::Grid);
                    }
                    5 => {
                        oracle.join();
                    }
                    10 => {
                        oracle.join();
                        oracle.join();
                    }
                    20 => oracle.leave(1),
                    30 => oracle.leave(3),
                    40 => oracle.leave(0),
                    _ => {}
                }
            })
            .await;

        let mut failures = Vec::new();
        let live = pipeline.state().vids.len();
        if live != oracle.present_count() {
            failures.push(format!(
                "world model holds {} tiles but ground truth has {}",
                live,
                oracle.present_count()
            ));
        }
        self.check(
            ScenarioId::TileChurn,
            ticks,
            &oracle,
            &pipeline,
            &auditor,
            spoken,
            max_pending,
            failures,
        )
    }

    /// SIM-004: Stationary tiles under heavy bbox jitter.
    ///
    /// Jitter stays well inside the match gate, so exactly one handle per
    /// tile must ever be minted.
    async fn run_drift_field(&self) -> ScenarioResult {
        let mut pipeline = VisualPipeline::with_defaults();
        let mut oracle = MeetingOracle::new(
            self.seed,
            OracleConfig {
                bbox_jitter: 0.02,
                flicker_prob: 0.0,
            },
        );
        let mut auditor = ReplayAuditor::new();
        let ticks = self.max_ticks.max(100);

        let (spoken, max_pending) = self
            .drive(&mut pipeline, &mut oracle, &mut auditor, ticks, |tick, oracle| {
                if tick == 0 {
                    for _ in 0..4 {
                        oracle.join();
                    }
                    oracle.set_layout(LayoutType::Grid);
                }
            })
            .await;

        self.check(
            ScenarioId::DriftField,
            ticks,
            &oracle,
            &pipeline,
            &auditor,
            spoken,
            max_pending,
            Vec::new(),
        )
    }

    /// SIM-005: Constant ground truth under isolated signal flicker.
    ///
    /// The oracle never raises a hand for real; every true reading is a
    /// one-tick flicker, and the 2-snapshot debounce must suppress all of
    /// them (the shared check demands zero hand events).
    async fn run_flicker_noise(&self) -> ScenarioResult {
        let mut pipeline = VisualPipeline::with_defaults();
        let mut oracle = MeetingOracle::new(
            self.seed,
            OracleConfig {
                bbox_jitter: 0.005,
                flicker_prob: 0.2,
            },
        );
        let mut auditor = ReplayAuditor::new();
        let ticks = self.max_ticks.max(100);

        let (spoken, max_pending) = self
            .drive(&mut pipeline, &mut oracle, &mut auditor, ticks, |tick, oracle| {
                if tick == 0 {
                    for _ in 0..5 {
                        oracle.join();
                    }
                    oracle.set_layout(LayoutType::Grid);
                }
            })
            .await;

        self.check(
            ScenarioId::FlickerNoise,
            ticks,
            &oracle,
            &pipeline,
            &auditor,
            spoken,
            max_pending,
            Vec::new(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
