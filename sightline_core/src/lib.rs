//! Sightline Core - Privacy-Preserving Visual-Delta Pipeline
//!
//! Turns periodic low-resolution composites of a live meeting UI into spoken
//! audio description, without ever inferring identity. Three engines solve
//! the three hard problems:
//! 1. **Continuity Problem**: region→handle matching with expiry and
//!    deterministic tie-breaking (`sightline_tracking`)
//! 2. **Noise Problem**: debounced, deduplicated state-transition events
//!    plus a replayable world model (`sightline_delta`, `state`)
//! 3. **Safety Problem**: multi-axis announcement admission and verbalization
//!    with a hard content blacklist (`sightline_policy`, `sightline_speech`)

pub mod types;
pub mod fingerprint;
pub mod events;
pub mod state;
pub mod sightline_tracking;
pub mod sightline_delta;
pub mod sightline_policy;
pub mod sightline_speech;
pub mod pipeline;
pub mod replay;
pub mod metrics;
pub mod api;

// Re-export key types for convenience
pub use types::{AudioSid, BBox, DetectedRegion, LayoutType, RegionKind, RegionSignals, Vid};
pub use fingerprint::{content_hash, generate_fingerprint, hash_similarity};
pub use events::{EventFactory, EventType, SessionId, VisualEvent, VisualEventKind, EVENT_SOURCE};
pub use state::{reduce, ScreenShareState, VidState, VisualState};
pub use sightline_tracking::{RegionAssignment, TrackReport, TrackerConfig, VidEntry, VidTracker};
pub use sightline_delta::{DeltaConfig, DeltaDetector, DeltaOutput};
pub use sightline_policy::{
    base_priority, AdPolicyGate, AllowedAdEvent, AudioActivity, PolicyConfig, Verbosity,
};
pub use sightline_speech::{
    position_phrase, validate_line, LineOrigin, LineRejection, LlmHandler, LlmLineContext,
    SpeechConfig, SpokenLine, Verbalizer, PROHIBITED_TERMS,
};
pub use pipeline::{PipelineConfig, SnapshotFrame, VisualPipeline};
pub use replay::{ReplayAuditor, ReplayMismatch, ReplayReport};
pub use metrics::PipelineMetrics;
pub use api::{
    events_path, snapshot_path, ClientAnalysis, SnapshotMime, SnapshotRequest, SnapshotResponse,
    StreamMessage,
};
