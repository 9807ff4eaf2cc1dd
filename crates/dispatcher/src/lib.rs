//! # Dispatcher
//!
//! Buffering, size-aware event dispatch to a batch-ingestion hub.
//!
//! Responsibilities:
//! - Queue collected `TrackingEvent`s, or print them when no hub is configured
//! - Pack queued events into size-limited batches and send them in order
//! - Drop events that can never fit a batch
//! - Reconnect after a failed cycle and retry on the next tick

pub mod collector;
pub mod connection;
pub mod console;
pub mod cycle;
pub mod dispatcher;
pub mod error;
pub mod hubs;
pub mod metrics;
pub mod packer;
pub mod queue;
pub mod scheduler;

pub use collector::{Collector, FlushOutcome};
pub use connection::{ConnectionManager, UNCONFIGURED_HUB};
pub use console::{format_console_line, CaptureSink, ConsoleSink, FallbackSink};
pub use contracts::{HubConfig, TrackingEvent};
pub use cycle::{BatchReport, CycleReport};
pub use dispatcher::{Dispatcher, DispatcherOptions};
pub use error::DispatcherError;
pub use hubs::{MemoryHub, MemoryHubProvider, UdpHubProvider};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use packer::{identity_formatter, Formatter};
pub use scheduler::FlushScheduler;
