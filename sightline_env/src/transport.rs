//! Transport contracts for snapshot submission and the event stream.
//!
//! Sans-IO: only the traits and protocol constants live here. A production
//! implementation wraps an HTTP client and a WebSocket; tests use in-memory
//! fakes.
//!
//! # Stream lifecycle
//!
//! ```text
//! Client                        Server
//!   |-- connect ws(s) .../events ->|
//!   |<----- visual_events ---------|
//!   |<----- visual_state_sync -----|
//!   |         (close)              |
//!   |-- wait RECONNECT_DELAY_MS    |
//!   |-- reconnect ---------------->|   (until unsubscribed)
//! ```

use async_trait::async_trait;

use crate::error::TransportError;
use sightline_core::api::{events_path, SnapshotRequest, SnapshotResponse, StreamMessage};

/// Delay before reconnecting a closed event stream, in ms.
pub const RECONNECT_DELAY_MS: u64 = 3_000;

/// Builds the event-stream URL for a call from the service base URL.
///
/// The stream lives at the same host with the scheme switched to `ws`/`wss`.
pub fn websocket_url(base_url: &str, call_id: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!("{}{}", ws_base.trim_end_matches('/'), events_path(call_id))
}

/// Submits snapshots for analysis.
///
/// An optional bearer token is a property of the implementation, never
/// interpreted here. Implementations map non-2xx statuses to
/// `SnapshotResponse::http_failure` or return [`TransportError::Http`];
/// callers retry on failure.
#[async_trait]
pub trait SnapshotTransport: Send + Sync + 'static {
    async fn submit_snapshot(
        &self,
        call_id: &str,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResponse, TransportError>;
}

/// A live subscription to the event stream of one call.
///
/// Implementations own the reconnect loop: on any close they wait
/// [`RECONNECT_DELAY_MS`] and reconnect, until [`EventStream::close`] is
/// called, after which `next_message` returns `None`.
#[async_trait]
pub trait EventStream: Send + Sync + 'static {
    /// Next message from the stream, or `None` after unsubscription.
    async fn next_message(&mut self) -> Option<StreamMessage>;

    /// Unsubscribes and stops reconnecting.
    async fn close(&mut self);
}
