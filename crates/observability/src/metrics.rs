//! Dispatch metrics
//!
//! Thin wrappers over the `metrics` facade, plus an in-memory aggregator
//! for end-of-run summaries.

use metrics::{counter, gauge, histogram};

/// Record one transmitted batch
pub fn record_batch_sent(hub: &str, events: usize, bytes: usize) {
    counter!("hub_dispatch_batches_sent_total", "hub" => hub.to_string()).increment(1);
    counter!("hub_dispatch_events_sent_total", "hub" => hub.to_string())
        .increment(events as u64);
    histogram!("hub_dispatch_batch_events", "hub" => hub.to_string()).record(events as f64);
    histogram!("hub_dispatch_batch_bytes", "hub" => hub.to_string()).record(bytes as f64);
}

/// Record an event dropped because it cannot fit an empty batch
pub fn record_oversized_dropped(hub: &str) {
    counter!("hub_dispatch_oversized_dropped_total", "hub" => hub.to_string()).increment(1);
}

/// Record an event refused because the pending queue is at its cap
pub fn record_queue_rejected(hub: &str) {
    counter!("hub_dispatch_queue_rejected_total", "hub" => hub.to_string()).increment(1);
}

/// Record the current pending queue depth
pub fn record_queue_depth(hub: &str, depth: usize) {
    gauge!("hub_dispatch_queue_depth", "hub" => hub.to_string()).set(depth as f64);
}

/// Record a failed transmission cycle
pub fn record_cycle_failure(hub: &str) {
    counter!("hub_dispatch_cycle_failures_total", "hub" => hub.to_string()).increment(1);
}

/// Record a client replacement
pub fn record_reconnect(hub: &str) {
    counter!("hub_dispatch_reconnects_total", "hub" => hub.to_string()).increment(1);
}

/// Record one flush (scheduled or explicit) and how long it took
pub fn record_flush(hub: &str, success: bool, elapsed_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hub_dispatch_flushes_total",
        "hub" => hub.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("hub_dispatch_flush_ms", "hub" => hub.to_string()).record(elapsed_ms);
}

/// Record an event written to the console fallback
pub fn record_fallback_logged() {
    counter!("hub_dispatch_fallback_logged_total").increment(1);
}

/// Dispatch statistics aggregator
///
/// Aggregates in memory so a run can print a summary without a scrape.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Batches sent
    pub total_batches: u64,

    /// Events sent
    pub total_events: u64,

    /// Oversized events dropped
    pub total_oversized: u64,

    /// Failed cycles
    pub total_failures: u64,

    /// Events per batch
    pub batch_events: RunningStats,

    /// Bytes per batch
    pub batch_bytes: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one sent batch
    pub fn record_batch(&mut self, events: usize, bytes: usize) {
        self.total_batches += 1;
        self.total_events += events as u64;
        self.batch_events.push(events as f64);
        self.batch_bytes.push(bytes as f64);
    }

    pub fn record_oversized(&mut self, count: usize) {
        self.total_oversized += count as u64;
    }

    pub fn record_failure(&mut self) {
        self.total_failures += 1;
    }

    /// Build a summary report
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total_batches: self.total_batches,
            total_events: self.total_events,
            total_oversized: self.total_oversized,
            total_failures: self.total_failures,
            drop_rate: if self.total_events + self.total_oversized > 0 {
                self.total_oversized as f64 / (self.total_events + self.total_oversized) as f64
                    * 100.0
            } else {
                0.0
            },
            batch_events: StatsSummary::from(&self.batch_events),
            batch_bytes: StatsSummary::from(&self.batch_bytes),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_batches: u64,
    pub total_events: u64,
    pub total_oversized: u64,
    pub total_failures: u64,
    pub drop_rate: f64,
    pub batch_events: StatsSummary,
    pub batch_bytes: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Batches sent: {}", self.total_batches)?;
        writeln!(f, "Events sent: {}", self.total_events)?;
        writeln!(
            f,
            "Oversized dropped: {} ({:.2}%)",
            self.total_oversized, self.drop_rate
        )?;
        writeln!(f, "Failed cycles: {}", self.total_failures)?;
        writeln!(f, "Events per batch: {}", self.batch_events)?;
        writeln!(f, "Bytes per batch: {}", self.batch_bytes)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();

        aggregator.record_batch(2, 120);
        aggregator.record_batch(2, 140);
        aggregator.record_oversized(1);
        aggregator.record_failure();

        let summary = aggregator.summary();
        assert_eq!(summary.total_batches, 2);
        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.total_oversized, 1);
        assert_eq!(summary.total_failures, 1);
        assert!((summary.drop_rate - 20.0).abs() < 1e-10);
        assert!((summary.batch_bytes.mean - 130.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.record_batch(4, 400);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Batches sent: 1"));
        assert!(output.contains("Events sent: 4"));
        assert!(output.contains("0.00%"));
    }

    #[test]
    fn test_recorders_without_installed_exporter() {
        // no global recorder: calls are no-ops
        record_batch_sent("hub", 3, 300);
        record_queue_depth("hub", 7);
        record_flush("hub", false, 1.5);
    }
}
