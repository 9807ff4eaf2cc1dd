//! Dispatcher - startup, scheduled flushing and shutdown

use std::sync::Arc;
use std::time::Duration;

use contracts::{HubConfig, HubProvider, TrackingEvent};
use observability::DispatchSummary;
use serde_json::Value;
use tracing::{info, instrument};

use crate::collector::{Collector, FlushOutcome, Inner};
use crate::console::{ConsoleSink, FallbackSink};
use crate::hubs::UdpHubProvider;
use crate::metrics::MetricsSnapshot;
use crate::packer::{identity_formatter, Formatter};
use crate::scheduler::FlushScheduler;

/// Everything needed to start a dispatcher
pub struct DispatcherOptions<P> {
    pub config: HubConfig,
    pub provider: P,
    pub formatter: Formatter,
    pub fallback: Arc<dyn FallbackSink>,
}

impl DispatcherOptions<UdpHubProvider> {
    /// UDP transport, events sent as-is, fallback to stdout
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            provider: UdpHubProvider,
            formatter: identity_formatter(),
            fallback: Arc::new(ConsoleSink),
        }
    }
}

impl<P> DispatcherOptions<P> {
    pub fn with_provider<Q>(self, provider: Q) -> DispatcherOptions<Q> {
        DispatcherOptions {
            config: self.config,
            provider,
            formatter: self.formatter,
            fallback: self.fallback,
        }
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&TrackingEvent) -> Value + Send + Sync + 'static,
    {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn with_fallback<S: FallbackSink + 'static>(mut self, fallback: S) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }
}

/// A running dispatcher
///
/// Owns the scheduler task. Hand out [`Collector`] clones to producers.
pub struct Dispatcher<P: HubProvider> {
    collector: Collector<P>,
    scheduler: FlushScheduler,
}

impl<P> Dispatcher<P>
where
    P: HubProvider + Send + Sync + 'static,
{
    /// Connect, then arm the flush scheduler
    ///
    /// A failed connect is logged; the scheduler is armed regardless.
    #[instrument(
        name = "dispatcher_start",
        skip(options),
        fields(hub = ?options.config.name, interval_ms = options.config.flush_interval_ms)
    )]
    pub async fn start(options: DispatcherOptions<P>) -> Self {
        let interval = Duration::from_millis(options.config.flush_interval_ms);
        let inner = Arc::new(Inner::new(
            &options.config,
            options.provider,
            options.formatter,
            options.fallback,
        ));

        inner.connect().await;

        let tick_inner = Arc::clone(&inner);
        let scheduler = FlushScheduler::spawn(interval, Arc::clone(inner.rearm()), move || {
            let inner = Arc::clone(&tick_inner);
            async move {
                inner.flush_queue().await;
            }
        });

        let collector = Collector::new(inner);
        info!(
            hub = %collector.hub(),
            live = collector.is_live(),
            "Dispatcher started"
        );

        Self {
            collector,
            scheduler,
        }
    }

    /// Handle for producers
    pub fn collector(&self) -> Collector<P> {
        self.collector.clone()
    }

    pub fn collect(&self, event: TrackingEvent) {
        self.collector.collect(event);
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.collector.flush().await
    }

    pub fn queue_len(&self) -> usize {
        self.collector.queue_len()
    }

    pub fn is_live(&self) -> bool {
        self.collector.is_live()
    }

    pub fn flush_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.collector.metrics()
    }

    pub fn summary(&self) -> DispatchSummary {
        self.collector.summary()
    }

    /// Stop the scheduler, flush once more and close the client
    ///
    /// Events still queued after the final flush are lost.
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(hub = %self.collector.hub()))]
    pub async fn shutdown(self) -> DispatchSummary {
        self.scheduler.stop().await;

        let inner = self.collector.inner();
        inner.flush_queue().await;
        inner.close().await;

        self.collector.log_summary();
        info!(remaining = self.collector.queue_len(), "Dispatcher shut down");
        self.collector.summary()
    }
}
