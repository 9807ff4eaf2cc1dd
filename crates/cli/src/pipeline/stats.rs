//! Run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DispatchSummary;

use super::FeedStats;

/// Everything reported at the end of a `run`
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub feed: FeedStats,
    pub duration: Duration,
    pub metrics: MetricsSnapshot,
    pub summary: DispatchSummary,
}

impl RunStats {
    /// Sent events per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.events_sent as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");

        println!("Input");
        println!("   Lines read: {}", self.feed.lines_read);
        println!("   Events collected: {}", self.feed.events_collected);
        println!("   Lines skipped: {}", self.feed.lines_skipped);

        println!("\nDispatch");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Events sent: {}", self.metrics.events_sent);
        println!("   Throughput: {:.2} events/s", self.throughput());
        println!("   Console fallback: {}", self.metrics.fallback_logged);
        println!("   Rejected (queue full): {}", self.metrics.rejected_full);
        println!("   Left in queue: {}", self.metrics.queue_len);
        println!("   Flushes: {}", self.metrics.flushes);
        println!("   Reconnects: {}", self.metrics.reconnects);

        println!("\n{}", self.summary);
    }
}
