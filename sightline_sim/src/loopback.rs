//! In-process transport for end-to-end wire testing.
//!
//! Implements the snapshot transport contract directly against a pipeline,
//! with no sockets involved: what a production client would POST is exactly
//! what this accepts, and what it returns is exactly the wire response
//! shape. Lets scenarios and tests cover the full request/response path
//! deterministically.

use async_trait::async_trait;
use tokio::sync::Mutex;

use sightline_core::api::{SnapshotRequest, SnapshotResponse};
use sightline_core::pipeline::{SnapshotFrame, VisualPipeline};
use sightline_env::{SnapshotTransport, TransportError};

/// A transport that feeds a locally owned pipeline.
pub struct LoopbackTransport {
    pipeline: Mutex<VisualPipeline>,
}

impl LoopbackTransport {
    pub fn new(pipeline: VisualPipeline) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
        }
    }

    /// Consumes the transport and returns the pipeline.
    pub fn into_pipeline(self) -> VisualPipeline {
        self.pipeline.into_inner()
    }
}

#[async_trait]
impl SnapshotTransport for LoopbackTransport {
    async fn submit_snapshot(
        &self,
        _call_id: &str,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResponse, TransportError> {
        // Loopback has no server-side analyzer; the client analysis is the
        // only source of regions
        let analysis = match &request.client_analysis {
            Some(analysis) => analysis,
            None => return Ok(SnapshotResponse::failure("client analysis required")),
        };

        let frame = SnapshotFrame {
            ts_obs_ms: request.ts_obs_ms,
            content_hash: request.content_hash.clone(),
            width: request.width,
            height: request.height,
            regions: analysis.regions.clone(),
            layout: analysis.layout,
        };

        let mut pipeline = self.pipeline.lock().await;
        let events = pipeline.ingest_snapshot(&frame).to_vec();
        Ok(SnapshotResponse::ok(events, Some(pipeline.state().clone())))
    }
}
