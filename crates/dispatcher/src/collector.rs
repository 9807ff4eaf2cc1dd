//! Collector facade - the application-facing half of the dispatcher
//!
//! `collect` never awaits and never fails. `flush` runs one transmission
//! cycle under the same lock the scheduler uses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use contracts::{HubConfig, HubProvider, TrackingEvent};
use observability::{DispatchStatsAggregator, DispatchSummary};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::connection::ConnectionManager;
use crate::console::FallbackSink;
use crate::cycle::{run_cycle, CycleContext, CycleReport};
use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::packer::Formatter;
use crate::queue::{QueueFull, SharedQueue};

/// Warn on the first rejection and then every this many
const REJECT_WARN_EVERY: u64 = 1000;

/// Result of one `flush_queue`
#[derive(Debug)]
pub enum FlushOutcome {
    Completed(CycleReport),
    Failed(DispatcherError),
}

impl FlushOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed(_) => None,
        }
    }
}

/// State shared by the collector handles and the scheduler task
pub(crate) struct Inner<P: HubProvider> {
    hub: String,
    queue: SharedQueue,
    live: Arc<AtomicBool>,
    connection: tokio::sync::Mutex<ConnectionManager<P>>,
    formatter: Formatter,
    fallback: Arc<dyn FallbackSink>,
    metrics: DispatchMetrics,
    stats: Mutex<DispatchStatsAggregator>,
    rearm: Arc<Notify>,
}

impl<P> Inner<P>
where
    P: HubProvider + Send + Sync + 'static,
{
    pub(crate) fn new(
        config: &HubConfig,
        provider: P,
        formatter: Formatter,
        fallback: Arc<dyn FallbackSink>,
    ) -> Self {
        let live = Arc::new(AtomicBool::new(false));
        let connection = ConnectionManager::new(
            provider,
            config.name.clone(),
            config.connection.clone(),
            Arc::clone(&live),
        );
        Self {
            hub: connection.hub().to_string(),
            queue: SharedQueue::new(config.max_queue_len),
            live,
            connection: tokio::sync::Mutex::new(connection),
            formatter,
            fallback,
            metrics: DispatchMetrics::new(),
            stats: Mutex::new(DispatchStatsAggregator::new()),
            rearm: Arc::new(Notify::new()),
        }
    }

    pub(crate) fn hub(&self) -> &str {
        &self.hub
    }

    pub(crate) fn rearm(&self) -> &Arc<Notify> {
        &self.rearm
    }

    /// Startup connect; failures are logged and leave fallback mode on
    pub(crate) async fn connect(&self) {
        let mut connection = self.connection.lock().await;
        if let Err(e) = connection.connect().await {
            error!(hub = %self.hub, error = %e, trace = ?e.trace(), "Initial hub connection failed");
        }
    }

    /// Close the client, best-effort
    pub(crate) async fn close(&self) {
        self.connection.lock().await.close().await;
    }

    /// One transmission cycle plus failure handling
    ///
    /// Never returns an error: a failed cycle is logged and followed by a
    /// reconnect. A configured hub without a client is a failed cycle even
    /// with an empty queue. Each call counts as exactly one reschedule.
    pub(crate) async fn flush_queue(&self) -> FlushOutcome {
        let started = Instant::now();
        let mut connection = self.connection.lock().await;

        let result = match connection.client() {
            Some(client) => {
                let ctx = CycleContext {
                    queue: &self.queue,
                    formatter: &self.formatter,
                    metrics: &self.metrics,
                    stats: &self.stats,
                };
                run_cycle(client, ctx).await
            }
            // console fallback by configuration: nothing to reconnect
            None if !connection.has_credentials() => Ok(CycleReport::default()),
            None => Err(DispatcherError::NotConnected {
                hub: self.hub.clone(),
            }),
        };

        let outcome = match result {
            Ok(report) => FlushOutcome::Completed(report),
            Err(e) => {
                error!(
                    hub = %self.hub,
                    error = %e,
                    trace = ?e.trace(),
                    queue_len = self.queue.len(),
                    "Transmission cycle failed"
                );
                self.metrics.inc_cycle_failures();
                observability::record_cycle_failure(&self.hub);
                self.stats().record_failure();

                match connection.connect().await {
                    Ok(()) if connection.is_live() => {
                        self.metrics.inc_reconnects();
                        observability::record_reconnect(&self.hub);
                    }
                    Ok(()) => {}
                    Err(reconnect) => error!(
                        hub = %self.hub,
                        error = %reconnect,
                        trace = ?reconnect.trace(),
                        "Reconnect failed"
                    ),
                }
                FlushOutcome::Failed(e)
            }
        };
        drop(connection);

        self.metrics.inc_flushes();
        observability::record_flush(
            &self.hub,
            outcome.is_completed(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        outcome
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, DispatchStatsAggregator> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle for emitting events
///
/// Clones share one queue and one connection.
pub struct Collector<P: HubProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: HubProvider> Clone for Collector<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Collector<P>
where
    P: HubProvider + Send + Sync + 'static,
{
    pub(crate) fn new(inner: Arc<Inner<P>>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<Inner<P>> {
        &self.inner
    }

    /// Accept one event
    ///
    /// Queued while the hub is live (including mid-reconnect), printed to
    /// the fallback sink and discarded otherwise. A full queue drops the new
    /// event.
    pub fn collect(&self, event: TrackingEvent) {
        let inner = &self.inner;

        if !inner.live.load(Ordering::Acquire) {
            inner.fallback.emit(&event);
            inner.metrics.inc_fallback_logged();
            observability::record_fallback_logged();
            return;
        }

        match inner.queue.push(event) {
            Ok(depth) => {
                inner.metrics.set_queue_len(depth);
                observability::record_queue_depth(&inner.hub, depth);
            }
            Err(QueueFull(event)) => {
                let total = inner.metrics.inc_rejected_full();
                observability::record_queue_rejected(&inner.hub);
                if (total - 1).is_multiple_of(REJECT_WARN_EVERY) {
                    warn!(
                        hub = %inner.hub,
                        kind = %event.kind,
                        label = %event.label,
                        rejected_total = total,
                        "Pending queue full, event dropped"
                    );
                }
            }
        }
    }

    /// Run a transmission cycle now and restart the flush timer
    pub async fn flush(&self) -> FlushOutcome {
        let outcome = self.inner.flush_queue().await;
        self.inner.rearm.notify_one();
        outcome
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Events are being queued for the hub
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire)
    }

    pub fn hub(&self) -> &str {
        self.inner.hub()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn summary(&self) -> DispatchSummary {
        self.inner.stats().summary()
    }

    /// Log the running totals
    pub fn log_summary(&self) {
        let metrics = self.metrics();
        info!(
            hub = %self.inner.hub,
            events_sent = metrics.events_sent,
            batches_sent = metrics.batches_sent,
            oversized_dropped = metrics.oversized_dropped,
            rejected_full = metrics.rejected_full,
            fallback_logged = metrics.fallback_logged,
            queue_len = self.queue_len(),
            "Dispatch summary"
        );
    }
}
