//! # Integration Tests
//!
//! End-to-end scenarios across the workspace crates.
//!
//! Covers:
//! - Event wire shape
//! - Scheduled dispatch against MemoryHub (ordering, oversized drops, retry)
//! - Real UDP delivery over loopback

#[cfg(test)]
mod contract_tests {
    use contracts::TrackingEvent;
    use serde_json::json;

    #[test]
    fn test_event_payload_shape() {
        let event = TrackingEvent::timer("page_load", 15.0).with_data("route", "/home");

        assert_eq!(
            event.to_payload(),
            json!({
                "type": "timer",
                "label": "page_load",
                "duration": 15.0,
                "data": { "route": "/home" }
            })
        );
    }

    #[test]
    fn test_event_round_trips_from_json_line() {
        let line = r#"{"type":"event","label":"click","count":2}"#;
        let event: TrackingEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.kind, "event");
        assert_eq!(event.count, Some(2));
        assert_eq!(event.to_payload(), serde_json::from_str::<serde_json::Value>(line).unwrap());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{HubConfig, TrackingEvent};
    use dispatcher::{CaptureSink, Dispatcher, DispatcherOptions, MemoryHub, MemoryHubProvider};
    use serde_json::Value;
    use tokio::time::sleep;

    async fn start(hub: &MemoryHub, config: HubConfig) -> (Dispatcher<MemoryHubProvider>, CaptureSink) {
        let sink = CaptureSink::new();
        let options = DispatcherOptions::new(config)
            .with_provider(hub.provider())
            .with_fallback(sink.clone());
        (Dispatcher::start(options).await, sink)
    }

    fn labels(events: &[Value]) -> Vec<String> {
        events
            .iter()
            .map(|v| v["label"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Collect -> scheduled tick -> MemoryHub
    ///
    /// Small batches force many batches per cycle; every event arrives once
    /// and in order.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_scheduled_dispatch_preserves_order() {
        let hub = MemoryHub::with_max_batch_bytes(200);
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;
        let expected: Vec<String> = (0..100).map(|i| format!("event-{i}")).collect();

        for label in &expected {
            dispatcher.collect(TrackingEvent::event(label.as_str()));
        }
        sleep(Duration::from_millis(1100)).await;

        assert!(hub.sent_batches().len() > 1);
        assert_eq!(labels(&hub.sent_events()), expected);
        assert_eq!(dispatcher.queue_len(), 0);
        assert_eq!(dispatcher.metrics().flushes, 1);

        dispatcher.shutdown().await;
    }

    /// Events that arrive while a cycle is idle-waiting go out on the next tick
    #[tokio::test(start_paused = true)]
    async fn test_e2e_late_events_wait_for_next_tick() {
        let hub = MemoryHub::new();
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;

        dispatcher.collect(TrackingEvent::event("first"));
        sleep(Duration::from_millis(1100)).await;
        dispatcher.collect(TrackingEvent::event("second"));
        assert_eq!(hub.sent_batches().len(), 1);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(labels(&hub.sent_events()), ["first", "second"]);
        assert_eq!(hub.sent_batches().len(), 2);

        dispatcher.shutdown().await;
    }

    /// An event that never fits is dropped once and never resent
    #[tokio::test(start_paused = true)]
    async fn test_e2e_oversized_event_never_resent() {
        let hub = MemoryHub::with_max_batch_bytes(100);
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;

        dispatcher.collect(TrackingEvent::event("before"));
        dispatcher.collect(TrackingEvent::event("huge").with_data("blob", "x".repeat(500)));
        dispatcher.collect(TrackingEvent::event("after"));

        sleep(Duration::from_millis(3500)).await;

        assert_eq!(labels(&hub.sent_events()), ["before", "after"]);
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.oversized_dropped, 1);
        assert_eq!(metrics.flushes, 3);

        let summary = dispatcher.shutdown().await;
        assert_eq!(summary.total_oversized, 1);
    }

    /// Send failure -> reconnect -> same events retried on the next tick
    #[tokio::test(start_paused = true)]
    async fn test_e2e_failure_reconnects_and_retries_unmodified() {
        let hub = MemoryHub::new();
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;
        for label in ["a", "b", "c"] {
            dispatcher.collect(TrackingEvent::event(label).with_data("n", label));
        }
        let queued: Vec<Value> = ["a", "b", "c"]
            .iter()
            .map(|l| TrackingEvent::event(*l).with_data("n", *l).to_payload())
            .collect();
        hub.fail_next_sends(1);

        sleep(Duration::from_millis(1100)).await;
        assert!(hub.sent_events().is_empty());
        assert_eq!(dispatcher.queue_len(), 3);
        assert_eq!(hub.connects().len(), 2);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(hub.sent_events(), queued);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.cycle_failures, 1);
        assert_eq!(metrics.reconnects, 1);
        assert_eq!(metrics.flushes, 2);

        dispatcher.shutdown().await;
    }

    /// Reschedule count grows by one per tick through repeated failures
    #[tokio::test(start_paused = true)]
    async fn test_e2e_scheduler_survives_repeated_failures() {
        let hub = MemoryHub::new();
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;
        dispatcher.collect(TrackingEvent::event("stubborn"));
        hub.fail_next_creates(5);

        // stay clear of the tick instants
        sleep(Duration::from_millis(100)).await;
        for tick in 1..=5u64 {
            sleep(Duration::from_millis(1000)).await;
            assert_eq!(dispatcher.metrics().flushes, tick);
        }
        assert_eq!(dispatcher.metrics().cycle_failures, 5);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(labels(&hub.sent_events()), ["stubborn"]);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_flush_with_third_add_refused() {
        let hub = MemoryHub::new();
        hub.refuse_try_add_call(3);
        let (dispatcher, _) = start(&hub, HubConfig::new("telemetry", "conn")).await;
        for label in ["1", "2", "3", "4"] {
            dispatcher.collect(TrackingEvent::event(label));
        }

        let outcome = dispatcher.flush().await;

        assert_eq!(hub.create_calls(), 2);
        let batches = hub.sent_batches();
        assert_eq!(labels(&batches[0]), ["1", "2"]);
        assert_eq!(labels(&batches[1]), ["3", "4"]);
        assert_eq!(outcome.report().map(|r| r.events_sent()), Some(4));

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_unconfigured_prints_to_console() {
        let hub = MemoryHub::new();
        let config = ConfigLoader::with_overrides(HubConfig::default(), |_| None).unwrap();
        let (dispatcher, sink) = start(&hub, config).await;

        dispatcher.collect(TrackingEvent::event("abc"));
        dispatcher.collect(TrackingEvent::timer("def", 15.0));
        dispatcher.collect(TrackingEvent::timer("ghi", 0.0));

        assert_eq!(sink.lines(), ["[EVENT] abc", "[TIMER] def (15 ms)", "[TIMER] ghi"]);
        assert!(hub.connects().is_empty());
        assert_eq!(dispatcher.queue_len(), 0);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_config_file_to_dispatch() {
        let toml = r#"
            name = "telemetry"
            connection = "memory"
            flush_interval_ms = 250
            max_queue_len = 2
        "#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let hub = MemoryHub::new();
        let (dispatcher, _) = start(&hub, config).await;

        assert_eq!(dispatcher.flush_interval(), Duration::from_millis(250));
        for label in ["a", "b", "c"] {
            dispatcher.collect(TrackingEvent::event(label));
        }
        assert_eq!(dispatcher.metrics().rejected_full, 1);

        let summary = dispatcher.shutdown().await;
        assert_eq!(summary.total_events, 2);
        assert_eq!(hub.connects(), vec![("memory".to_string(), "telemetry".to_string())]);
    }
}

#[cfg(test)]
mod udp_tests {
    use std::time::Duration;

    use contracts::{HubConfig, TrackingEvent};
    use dispatcher::{CaptureSink, Dispatcher, DispatcherOptions};
    use serde_json::Value;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn receive(socket: &UdpSocket) -> Value {
        let mut buf = vec![0u8; 65536];
        let len = timeout(Duration::from_secs(5), socket.recv(&mut buf))
            .await
            .expect("datagram timed out")
            .unwrap();
        serde_json::from_slice(&buf[..len]).unwrap()
    }

    /// Real datagrams over loopback, split by MaxBatchBytes
    #[tokio::test]
    async fn test_udp_loopback_delivery() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let connection = format!("Endpoint=udp://127.0.0.1:{port};MaxBatchBytes=256");

        let options = DispatcherOptions::new(HubConfig::new("telemetry", connection))
            .with_fallback(CaptureSink::new());
        let dispatcher = Dispatcher::start(options).await;
        assert!(dispatcher.is_live());

        let expected: Vec<String> = (0..20).map(|i| format!("udp-{i}")).collect();
        for label in &expected {
            dispatcher.collect(TrackingEvent::event(label.as_str()));
        }
        let outcome = dispatcher.flush().await;
        let batches = outcome.report().map(|r| r.batches.len()).unwrap_or_default();
        assert!(batches > 1);

        let mut received = Vec::new();
        for _ in 0..batches {
            let datagram = receive(&receiver).await;
            assert_eq!(datagram["hub"], "telemetry");
            assert!(serde_json::to_vec(&datagram).unwrap().len() <= 256);
            for event in datagram["events"].as_array().unwrap() {
                received.push(event["label"].as_str().unwrap().to_string());
            }
        }

        assert_eq!(received, expected);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_udp_bad_connection_string_falls_back() {
        let options = DispatcherOptions::new(HubConfig::new("telemetry", "Endpoint=sb://nowhere"))
            .with_fallback(CaptureSink::new());
        let dispatcher = Dispatcher::start(options).await;

        assert!(!dispatcher.is_live());
        dispatcher.collect(TrackingEvent::event("offline"));
        assert_eq!(dispatcher.metrics().fallback_logged, 1);

        dispatcher.shutdown().await;
    }
}
