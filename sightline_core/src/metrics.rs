//! Session-local pipeline counters.
//!
//! Pure data, no exporter: the owning service decides where the numbers go.

use std::collections::BTreeMap;

use crate::events::EventType;

/// Counters collected over one pipeline session.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Snapshots ingested
    pub snapshots: u64,

    /// Events emitted, total and by type
    pub events_total: u64,
    pub events_by_type: BTreeMap<EventType, u64>,

    /// Announcements that passed admission
    pub candidates_admitted: u64,

    /// Announcements actually rendered to speech
    pub announcements_spoken: u64,

    /// Announcements shed by the queue bound
    pub announcements_dropped: u64,

    /// Times the composed line was rejected and the template used
    pub llm_fallbacks: u64,

    /// Regions skipped for failing validation
    pub regions_skipped: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_snapshot(&mut self) {
        self.snapshots += 1;
    }

    pub fn record_event(&mut self, event_type: EventType) {
        self.events_total += 1;
        *self.events_by_type.entry(event_type).or_insert(0) += 1;
    }

    pub fn record_admitted(&mut self, count: usize) {
        self.candidates_admitted += count as u64;
    }

    pub fn record_spoken(&mut self) {
        self.announcements_spoken += 1;
    }

    pub fn record_dropped(&mut self, count: usize) {
        self.announcements_dropped += count as u64;
    }

    pub fn record_llm_fallback(&mut self) {
        self.llm_fallbacks += 1;
    }

    pub fn record_skipped_regions(&mut self, count: usize) {
        self.regions_skipped += count as u64;
    }

    /// Count for one event type.
    pub fn events_of(&self, event_type: EventType) -> u64 {
        self.events_by_type.get(&event_type).copied().unwrap_or(0)
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "snapshots={} events={} admitted={} spoken={} dropped={} fallbacks={} skipped_regions={}",
            self.snapshots,
            self.events_total,
            self.candidates_admitted,
            self.announcements_spoken,
            self.announcements_dropped,
            self.llm_fallbacks,
            self.regions_skipped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_snapshot();
        metrics.record_event(EventType::HandRaised);
        metrics.record_event(EventType::HandRaised);
        metrics.record_event(EventType::SlideChanged);
        metrics.record_admitted(2);
        metrics.record_spoken();
        metrics.record_dropped(1);

        assert_eq!(metrics.snapshots, 1);
        assert_eq!(metrics.events_total, 3);
        assert_eq!(metrics.events_of(EventType::HandRaised), 2);
        assert_eq!(metrics.events_of(EventType::LayoutChanged), 0);
        assert_eq!(metrics.candidates_admitted, 2);
        assert_eq!(metrics.announcements_spoken, 1);
        assert_eq!(metrics.announcements_dropped, 1);
    }

    #[test]
    fn test_summary_mentions_every_counter() {
        let metrics = PipelineMetrics::new();
        let summary = metrics.summary();
        for key in ["snapshots", "events", "admitted", "spoken", "dropped"] {
            assert!(summary.contains(key), "missing {}", key);
        }
    }
}
