//! Sightline Environment Abstraction Layer
//!
//! This crate keeps the core engines free of I/O. Two seams:
//! - Time: every core operation takes `now_ms` explicitly; services obtain
//!   it from a [`MeetingClock`] so tests can pin the clock.
//! - Transport: snapshot submission and the event stream are specified as
//!   traits plus wire shapes only. Real HTTP/WebSocket plumbing lives with
//!   the embedding service, not here.
//!
//! # Example
//!
//! ```ignore
//! use sightline_env::{MeetingClock, TokioClock};
//!
//! async fn tick_loop<C: MeetingClock>(clock: &C) {
//!     loop {
//!         let now_ms = clock.now_ms();
//!         ingest(now_ms);
//!         clock.sleep_ms(1000).await;
//!     }
//! }
//! ```

mod context;
mod error;
mod tokio_impl;
mod transport;

pub use context::{ManualClock, MeetingClock};
pub use error::TransportError;
pub use tokio_impl::TokioClock;
pub use transport::{
    websocket_url, EventStream, SnapshotTransport, RECONNECT_DELAY_MS,
};
