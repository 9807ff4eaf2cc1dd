//! Transmission cycle - drain a snapshot of the queue through one client
//!
//! The snapshot is taken once; the live queue only loses events that were
//! confirmed sent or dropped as oversized. Events enqueued while the cycle
//! awaits the hub wait for the next cycle.

use std::sync::{Mutex, PoisonError};

use contracts::{EventBatch, HubClient};
use observability::DispatchStatsAggregator;
use tracing::{debug, instrument};

use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;
use crate::packer::{pack, Formatter};
use crate::queue::SharedQueue;

/// One transmitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub events: usize,
    pub bytes: usize,
}

/// What a completed cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub batches: Vec<BatchReport>,
    pub oversized: usize,
}

impl CycleReport {
    pub fn events_sent(&self) -> usize {
        self.batches.iter().map(|b| b.events).sum()
    }

    /// Nothing was sent or dropped
    pub fn is_idle(&self) -> bool {
        self.batches.is_empty() && self.oversized == 0
    }
}

/// Borrowed dispatcher state a cycle works on
pub struct CycleContext<'a> {
    pub queue: &'a SharedQueue,
    pub formatter: &'a Formatter,
    pub metrics: &'a DispatchMetrics,
    pub stats: &'a Mutex<DispatchStatsAggregator>,
}

impl CycleContext<'_> {
    fn stats(&self, record: impl FnOnce(&mut DispatchStatsAggregator)) {
        record(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Run one transmission cycle
///
/// Keeps creating batches until every event in the starting snapshot is
/// either sent or dropped. An empty snapshot still requests one batch, so a
/// dead client is found without waiting for traffic. The first error aborts the cycle; removals
/// already committed stay committed.
#[instrument(name = "transmission_cycle", skip_all, fields(hub = %client.name()))]
pub async fn run_cycle<C>(client: &C, ctx: CycleContext<'_>) -> Result<CycleReport, DispatcherError>
where
    C: HubClient + Sync,
{
    let hub = client.name();
    let mut working = ctx.queue.snapshot();
    let mut report = CycleReport::default();

    // At least one batch per cycle, even for an empty snapshot
    loop {
        let mut batch = client
            .create_batch()
            .await
            .map_err(|source| DispatcherError::CreateBatch {
                hub: hub.to_string(),
                source,
            })?;

        let packed = pack(&mut working, &mut batch, ctx.formatter);

        if !batch.is_empty() {
            let events = batch.count();
            let bytes = batch.size_in_bytes();

            client
                .send_batch(batch)
                .await
                .map_err(|source| DispatcherError::SendBatch {
                    hub: hub.to_string(),
                    events,
                    source,
                })?;

            let depth = ctx.queue.remove_all(&packed.sent);
            ctx.metrics.add_batch(events);
            ctx.metrics.set_queue_len(depth);
            observability::record_batch_sent(hub, events, bytes);
            observability::record_queue_depth(hub, depth);
            ctx.stats(|s| s.record_batch(events, bytes));

            debug!(
                hub,
                batch_events = events,
                bytes,
                queue_len = depth,
                remaining = working.len(),
                "Batch sent"
            );
            report.batches.push(BatchReport { events, bytes });
        } else if packed.first_item_refused() {
            // An item that does not fit an empty batch never will; keeping it
            // would block every event behind it.
            if let Some(oversized) = working.pop_front() {
                let depth = ctx.queue.remove(oversized.seq);
                ctx.metrics.inc_oversized_dropped();
                ctx.metrics.set_queue_len(depth);
                observability::record_oversized_dropped(hub);
                ctx.stats(|s| s.record_oversized(1));

                debug!(
                    hub,
                    kind = %oversized.event.kind,
                    label = %oversized.event.label,
                    max_bytes = batch.max_size_in_bytes(),
                    "Dropped event larger than an empty batch"
                );
                report.oversized += 1;
            }
        }

        if working.is_empty() {
            break;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubs::{MemoryClient, MemoryHub};
    use crate::packer::identity_formatter;
    use contracts::{HubProvider, TrackingEvent};
    use serde_json::Value;

    async fn client(hub: &MemoryHub) -> MemoryClient {
        hub.provider().connect("conn", "hub").await.unwrap()
    }

    fn labels(values: &[Value]) -> Vec<&str> {
        values.iter().map(|v| v["label"].as_str().unwrap()).collect()
    }

    fn queue_of(labels: &[&str]) -> SharedQueue {
        let queue = SharedQueue::new(None);
        for label in labels {
            queue.push(TrackingEvent::event(*label)).unwrap();
        }
        queue
    }

    async fn cycle(hub: &MemoryHub, queue: &SharedQueue) -> Result<CycleReport, DispatcherError> {
        let client = client(hub).await;
        let formatter = identity_formatter();
        let metrics = DispatchMetrics::new();
        let stats = Mutex::new(DispatchStatsAggregator::new());
        run_cycle(
            &client,
            CycleContext {
                queue,
                formatter: &formatter,
                metrics: &metrics,
                stats: &stats,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_sends_everything_in_order() {
        let hub = MemoryHub::new();
        let queue = queue_of(&["a", "b", "c"]);

        let report = cycle(&hub, &queue).await.unwrap();

        assert_eq!(report.events_sent(), 3);
        assert_eq!(labels(&hub.sent_events()), ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_refused_third_add_splits_into_two_batches() {
        let hub = MemoryHub::new();
        hub.refuse_try_add_call(3);
        let queue = queue_of(&["1", "2", "3", "4"]);

        let report = cycle(&hub, &queue).await.unwrap();

        assert_eq!(hub.create_calls(), 2);
        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.batches[0].events, 2);
        assert_eq!(report.events_sent(), 4);
        let batches = hub.sent_batches();
        assert_eq!(labels(&batches[0]), ["1", "2"]);
        assert_eq!(labels(&batches[1]), ["3", "4"]);
    }

    #[tokio::test]
    async fn test_oversized_item_dropped_once() {
        // [{"label":"a","type":"event"}] is 30 bytes
        let hub = MemoryHub::with_max_batch_bytes(40);
        let queue = SharedQueue::new(None);
        queue.push(TrackingEvent::event("a")).unwrap();
        queue
            .push(TrackingEvent::event("big").with_data("blob", "x".repeat(100)))
            .unwrap();
        queue.push(TrackingEvent::event("b")).unwrap();

        let report = cycle(&hub, &queue).await.unwrap();

        assert_eq!(report.oversized, 1);
        assert_eq!(labels(&hub.sent_events()), ["a", "b"]);
        assert!(queue.is_empty());
        // a, big (refused) / big (refused, dropped) / b
        assert_eq!(hub.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_every_item_oversized_sends_nothing() {
        let hub = MemoryHub::with_max_batch_bytes(4);
        let queue = queue_of(&["a", "b"]);

        let report = cycle(&hub, &queue).await.unwrap();

        assert_eq!(report.oversized, 2);
        assert_eq!(hub.send_calls(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_cycle_keeps_committed_removals() {
        let hub = MemoryHub::new();
        // batch one = [a], batch two = [b, c] and its send fails
        hub.refuse_try_add_call(2);
        hub.fail_send_call(2);
        let queue = queue_of(&["a", "b", "c"]);

        let err = cycle(&hub, &queue).await.unwrap_err();

        assert!(matches!(err, DispatcherError::SendBatch { events: 2, .. }));
        assert_eq!(labels(&hub.sent_events()), ["a"]);
        let remaining: Vec<_> = queue
            .snapshot()
            .iter()
            .map(|p| p.event.label.clone())
            .collect();
        assert_eq!(remaining, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_send_failure_aborts_and_preserves_queue() {
        let hub = MemoryHub::new();
        hub.fail_next_sends(1);
        let queue = queue_of(&["a", "b"]);

        let err = cycle(&hub, &queue).await.unwrap_err();

        assert!(matches!(err, DispatcherError::SendBatch { events: 2, .. }));
        assert_eq!(queue.len(), 2);
        assert!(hub.sent_events().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_aborts() {
        let hub = MemoryHub::new();
        hub.fail_next_creates(1);
        let queue = queue_of(&["a"]);

        let err = cycle(&hub, &queue).await.unwrap_err();

        assert!(matches!(err, DispatcherError::CreateBatch { .. }));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_requests_one_batch() {
        let hub = MemoryHub::new();
        let queue = SharedQueue::new(None);

        let report = cycle(&hub, &queue).await.unwrap();

        assert!(report.is_idle());
        assert_eq!(hub.create_calls(), 1);
        assert_eq!(hub.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_surfaces_dead_client() {
        let hub = MemoryHub::new();
        hub.fail_next_creates(1);
        let queue = SharedQueue::new(None);

        let err = cycle(&hub, &queue).await.unwrap_err();

        assert!(matches!(err, DispatcherError::CreateBatch { .. }));
    }
}
