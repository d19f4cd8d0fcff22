//! The "SPEECH" Engine - Safe Announcement Synthesis
//!
//! Renders admitted events into short spoken lines. Two paths:
//! - Deterministic templates, always available, always safe
//! - An optional injected LLM handler, whose output must pass validation
//!   before it is accepted
//!
//! The privacy guarantee is a property of the *output*: any line that
//! mentions identity, appearance, emotion, race/ethnicity, or age is
//! rejected and the template line is spoken instead. Position is the only
//! spatial cue, rendered as a 3x3 grid phrase ("top left", "middle center").

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::events::{EventType, VisualEvent, VisualEventKind};
use crate::sightline_policy::Verbosity;
use crate::state::VisualState;
use crate::types::{BBox, LayoutType, RegionKind};

// ============================================================================
// CONTENT BLACKLIST
// ============================================================================

/// Terms that must never appear in a spoken line (case-insensitive
/// substring match). Grouped: gender, appearance, emotion, race/ethnicity,
/// age.
pub const PROHIBITED_TERMS: &[&str] = &[
    // gender
    "man", "woman", "boy", "girl", "person named", "user named",
    // appearance
    "wearing", "dressed", "hair", "face", "eyes", "skin", "looks like",
    "attractive", "young", "old", "tall", "short", "glasses",
    // emotion
    "happy", "sad", "angry", "excited", "bored", "confused", "frustrated",
    "smiling", "frowning", "laughing", "crying",
    // race / ethnicity
    "white", "black", "asian", "latino", "hispanic", "african",
    // age
    "elderly", "teenager", "child", "adult",
];

/// Why a candidate line was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LineRejection {
    #[error("exceeds maximum length ({length} > {max_length})")]
    TooLong { length: usize, max_length: usize },

    #[error("empty after trimming")]
    Empty,

    #[error("prohibited term: {0:?}")]
    ProhibitedTerm(String),
}

/// Validates a candidate spoken line.
///
/// Applied to every LLM-produced line before acceptance; templates are
/// written to pass it by construction.
pub fn validate_line(text: &str, max_length: usize) -> Result<(), LineRejection> {
    let length = text.chars().count();
    if length > max_length {
        return Err(LineRejection::TooLong { length, max_length });
    }
    if text.trim().is_empty() {
        return Err(LineRejection::Empty);
    }
    let lowered = text.to_lowercase();
    for term in PROHIBITED_TERMS {
        if lowered.contains(term) {
            return Err(LineRejection::ProhibitedTerm((*term).to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// POSITION RENDERING
// ============================================================================

/// Renders a bbox origin into a 3x3 grid phrase.
///
/// This is the only spatial description a line ever carries; it names a
/// screen cell, never a person.
pub fn position_phrase(bbox: &BBox) -> String {
    let col = ((bbox.x * 3.0).floor() as i64).clamp(0, 2) as usize;
    let row = ((bbox.y * 3.0).floor() as i64).clamp(0, 2) as usize;
    const ROWS: [&str; 3] = ["top", "middle", "bottom"];
    const COLS: [&str; 3] = ["left", "center", "right"];
    format!("{} {}", ROWS[row], COLS[col])
}

// ============================================================================
// LLM HANDLER INJECTION
// ============================================================================

/// Structured context handed to an injected line composer.
///
/// Deliberately excludes bbox coordinates, fingerprints, and any image
/// data; the composer sees only the same abstractions the templates use.
#[derive(Debug, Clone, Serialize)]
pub struct LlmLineContext {
    pub event_type: EventType,
    pub position: Option<String>,
    pub region_kind: Option<RegionKind>,
    pub layout_from: Option<LayoutType>,
    pub layout_to: Option<LayoutType>,
    pub participant_count: usize,
    pub hand_raised_count: usize,
    pub screen_share_active: bool,
    pub layout: LayoutType,
    pub verbosity: Verbosity,
}

/// An externally injected async line composer.
///
/// The handler owns its own timeout policy; any error here is caught and
/// degraded to the template path.
#[async_trait]
pub trait LlmHandler: Send + Sync {
    async fn compose_line(
        &self,
        context: &LlmLineContext,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the Verbalizer
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Try the injected handler before the template (default: false).
    /// True with no handler installed silently takes the template path.
    pub use_llm: bool,

    /// Maximum accepted line length in chars (default: 120)
    pub max_length: usize,

    pub verbosity: Verbosity,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            max_length: 120,
            verbosity: Verbosity::Normal,
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Where a spoken line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Template,
    Llm,
    /// The handler was tried and failed or was rejected; template used
    LlmFallback,
}

/// A finished spoken line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenLine {
    pub text: String,
    pub origin: LineOrigin,
}

// ============================================================================
// VERBALIZER (The Engine)
// ============================================================================

/// Renders events into spoken lines.
pub struct Verbalizer {
    config: SpeechConfig,
    handler: Option<Arc<dyn LlmHandler>>,
}

impl Verbalizer {
    /// Creates a new verbalizer with the given configuration.
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            config,
            handler: None,
        }
    }

    /// Creates a new verbalizer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SpeechConfig::default())
    }

    /// Installs the line composer.
    pub fn with_handler(mut self, handler: Arc<dyn LlmHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    // ========================================================================
    // TEMPLATE PATH
    // ========================================================================

    /// Renders the deterministic template line for an event.
    ///
    /// Returns `None` for events with no spoken form.
    pub fn render_template(&self, event: &VisualEvent) -> Option<String> {
        let minimal = self.config.verbosity == Verbosity::Minimal;
        let line = match &event.kind {
            VisualEventKind::HandRaised { bbox, .. } => {
                if minimal {
                    format!("Hand raised {}", position_phrase(bbox))
                } else {
                    format!("Participant {} raised their hand", position_phrase(bbox))
                }
            }
            VisualEventKind::HandLowered { bbox, .. } => {
                if minimal {
                    format!("Hand lowered {}", position_phrase(bbox))
                } else {
                    format!("Participant {} lowered their hand", position_phrase(bbox))
                }
            }
            VisualEventKind::ScreenShareStarted { .. } => "Screen sharing started".to_string(),
            VisualEventKind::ScreenShareStopped { .. } => "Screen sharing stopped".to_string(),
            VisualEventKind::SlideChanged { .. } => {
                if minimal {
                    "Slide changed".to_string()
                } else {
                    "Presentation moved to a new slide".to_string()
                }
            }
            VisualEventKind::LayoutChanged { to, .. } => {
                if minimal {
                    format!("{} view", to.as_str())
                } else {
                    format!("View changed to {} layout", to.as_str())
                }
            }
            VisualEventKind::VidAppeared { .. } => {
                if minimal {
                    "Participant joined".to_string()
                } else {
                    "A new participant tile appeared".to_string()
                }
            }
            VisualEventKind::VidDisappeared { .. } => {
                if minimal {
                    "Participant left".to_string()
                } else {
                    "A participant tile left the view".to_string()
                }
            }
            _ => return None,
        };
        Some(line)
    }

    // ========================================================================
    // COMPOSITION
    // ========================================================================

    /// Produces the spoken line for an event.
    ///
    /// Suspends only at the injected handler boundary. Every handler
    /// failure mode (error, over-length, empty, prohibited term) degrades
    /// to the template line.
    pub async fn verbalize(&self, event: &VisualEvent, state: &VisualState) -> Option<SpokenLine> {
        let template = self.render_template(event)?;

        let handler = match (&self.handler, self.config.use_llm) {
            (Some(handler), true) => handler,
            _ => {
                return Some(SpokenLine {
                    text: template,
                    origin: LineOrigin::Template,
                })
            }
        };

        let context = self.build_context(event, state);
        match handler.compose_line(&context).await {
            Ok(raw) => {
                let candidate = raw.trim().to_string();
                match validate_line(&candidate, self.config.max_length) {
                    Ok(()) => Some(SpokenLine {
                        text: candidate,
                        origin: LineOrigin::Llm,
                    }),
                    Err(reason) => {
                        warn!(%reason, event_type = %event.event_type(), "composed line rejected, using template");
                        Some(SpokenLine {
                            text: template,
                            origin: LineOrigin::LlmFallback,
                        })
                    }
                }
            }
            Err(error) => {
                warn!(%error, event_type = %event.event_type(), "line composer failed, using template");
                Some(SpokenLine {
                    text: template,
                    origin: LineOrigin::LlmFallback,
                })
            }
        }
    }

    fn build_context(&self, event: &VisualEvent, state: &VisualState) -> LlmLineContext {
        let position = match &event.kind {
            VisualEventKind::HandRaised { bbox, .. } | VisualEventKind::HandLowered { bbox, .. } => {
                Some(position_phrase(bbox))
            }
            _ => None,
        };
        let region_kind = event
            .kind
            .vid()
            .and_then(|vid| state.vids.get(&vid))
            .map(|v| v.kind);
        let (layout_from, layout_to) = match &event.kind {
            VisualEventKind::LayoutChanged { from, to } => (Some(*from), Some(*to)),
            _ => (None, None),
        };

        LlmLineContext {
            event_type: event.event_type(),
            position,
            region_kind,
            layout_from,
            layout_to,
            participant_count: state.participant_count(),
            hand_raised_count: state.hand_raised_count,
            screen_share_active: state.screen_share.active,
            layout: state.layout,
            verbosity: self.config.verbosity,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
