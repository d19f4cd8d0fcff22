//! Deterministic simulation harness for the sightline pipeline.
//!
//! A seeded [`MeetingOracle`] maintains the ground truth of a synthetic
//! meeting and renders noisy region observations from it; the
//! [`ScenarioRunner`] drives the full pipeline with those observations and
//! asserts the pipeline's contracts against the oracle's edge counters.
//! Any failure is reproducible from its seed.

pub mod loopback;
pub mod oracle;
pub mod runner;
pub mod scenarios;

pub use loopback::LoopbackTransport;
pub use oracle::{MeetingOracle, OracleConfig};
pub use runner::{ScenarioResult, ScenarioRunner, SimMetrics};
pub use scenarios::ScenarioId;
