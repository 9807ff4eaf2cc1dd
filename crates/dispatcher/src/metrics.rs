//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current pending queue length
    queue_len: AtomicUsize,
    /// Events confirmed sent
    events_sent: AtomicU64,
    /// Batches transmitted
    batches_sent: AtomicU64,
    /// Events dropped because they never fit an empty batch
    oversized_dropped: AtomicU64,
    /// Events refused because the queue was at its cap
    rejected_full: AtomicU64,
    /// Events written to the console fallback
    fallback_logged: AtomicU64,
    /// Cycles that ended in an error
    cycle_failures: AtomicU64,
    /// Successful client constructions after startup
    reconnects: AtomicU64,
    /// flush_queue invocations; one reschedule each
    flushes: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// Account one transmitted batch of `events`
    pub fn add_batch(&self, events: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.events_sent.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn oversized_dropped(&self) -> u64 {
        self.oversized_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_oversized_dropped(&self) {
        self.oversized_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected_full(&self) -> u64 {
        self.rejected_full.load(Ordering::Relaxed)
    }

    /// Returns the new total
    pub fn inc_rejected_full(&self) -> u64 {
        self.rejected_full.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn fallback_logged(&self) -> u64 {
        self.fallback_logged.load(Ordering::Relaxed)
    }

    pub fn inc_fallback_logged(&self) {
        self.fallback_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycle_failures(&self) -> u64 {
        self.cycle_failures.load(Ordering::Relaxed)
    }

    pub fn inc_cycle_failures(&self) {
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn inc_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn inc_flushes(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            events_sent: self.events_sent(),
            batches_sent: self.batches_sent(),
            oversized_dropped: self.oversized_dropped(),
            rejected_full: self.rejected_full(),
            fallback_logged: self.fallback_logged(),
            cycle_failures: self.cycle_failures(),
            reconnects: self.reconnects(),
            flushes: self.flushes(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub events_sent: u64,
    pub batches_sent: u64,
    pub oversized_dropped: u64,
    pub rejected_full: u64,
    pub fallback_logged: u64,
    pub cycle_failures: u64,
    pub reconnects: u64,
    pub flushes: u64,
}
