//! Metrics instrumentation for sweep observability.

use crate::progress::ScanStats;
use crate::types::Rule;
use std::time::Instant;

/// Record how long a full sweep took.
pub fn record_sweep_duration(duration_ms: f64) {
    metrics::histogram!("sweep_duration", duration_ms);
}

/// Record latency of a single remote listing call.
pub fn record_listing_latency(duration_ms: f64) {
    metrics::histogram!("file_listing_latency", duration_ms);
}

/// Increment detection counter for a rule.
pub fn increment_detection(rule: Rule) {
    metrics::counter!("detections", 1, "rule" => rule.id());
}

/// Publish end-of-sweep totals.
pub fn record_sweep_stats(stats: &ScanStats) {
    metrics::counter!("instances_scanned", stats.instances_scanned as u64);
    metrics::counter!("files_visited", stats.files_visited as u64);
    metrics::counter!("scan_errors", stats.errors as u64);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            "sweep_duration" => record_sweep_duration(duration_ms),
            "file_listing_latency" => record_listing_latency(duration_ms),
            _ => {}
        }
    }
}
