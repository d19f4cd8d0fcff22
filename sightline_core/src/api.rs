//! Wire contracts for snapshot submission and the event stream.
//!
//! Transport itself (HTTP client, WebSocket) is an external collaborator;
//! this module pins the request/response shapes and the stream protocol it
//! must speak.

use serde::{Deserialize, Serialize};

use crate::events::VisualEvent;
use crate::state::VisualState;
use crate::types::{DetectedRegion, LayoutType};

// ============================================================================
// PATHS
// ============================================================================

/// Path of the snapshot submission endpoint for a call.
pub fn snapshot_path(call_id: &str) -> String {
    format!("/v1/calls/{}/visual/snapshot", call_id)
}

/// Path of the event stream endpoint for a call.
pub fn events_path(call_id: &str) -> String {
    format!("/v1/calls/{}/visual/events", call_id)
}

// ============================================================================
// SNAPSHOT SUBMISSION
// ============================================================================

/// Accepted snapshot encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

/// Client-side analysis attached to a snapshot, when available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAnalysis {
    pub regions: Vec<DetectedRegion>,
    pub layout: LayoutType,
}

/// `POST /v1/calls/{callId}/visual/snapshot` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub ts_obs_ms: u64,

    /// 8-hex lowercase content hash of the composite
    pub content_hash: String,

    pub mime: SnapshotMime,
    pub width: u32,
    pub height: u32,
    pub bytes_base64: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_analysis: Option<ClientAnalysis>,
}

/// Snapshot submission response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub success: bool,
    pub events: Vec<VisualEvent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<VisualState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotResponse {
    /// Successful submission carrying the emitted events and current state.
    pub fn ok(events: Vec<VisualEvent>, state: Option<VisualState>) -> Self {
        Self {
            success: true,
            events,
            state,
            error: None,
        }
    }

    /// Failed submission with a reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            events: Vec::new(),
            state: None,
            error: Some(error.into()),
        }
    }

    /// Mapping for a non-2xx transport status.
    pub fn http_failure(status: u16) -> Self {
        Self::failure(format!("HTTP {}", status))
    }
}

// ============================================================================
// EVENT STREAM PROTOCOL
// ============================================================================

/// Messages carried as text frames on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// A batch of newly emitted events
    VisualEvents { events: Vec<VisualEvent> },

    /// Full state resynchronization
    VisualStateSync { state: VisualState },

    /// Stream-level error report
    VisualError { message: String },
}

// ============================================================================
// TESTS
// ============================================================================
