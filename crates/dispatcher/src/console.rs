//! Fallback console sink
//!
//! Used when no hub connection is configured: events are printed and
//! discarded instead of queued.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::TrackingEvent;

/// Where events go when there is no hub
pub trait FallbackSink: Send + Sync {
    fn emit(&self, event: &TrackingEvent);
}

/// `[TYPE] label` with ` (N ms)` appended for a positive duration
pub fn format_console_line(event: &TrackingEvent) -> String {
    let kind = event.kind.to_uppercase();
    match event.positive_duration() {
        Some(duration) => format!("[{}] {} ({} ms)", kind, event.label, duration),
        None => format!("[{}] {}", kind, event.label),
    }
}

/// Prints to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl FallbackSink for ConsoleSink {
    fn emit(&self, event: &TrackingEvent) {
        println!("{}", format_console_line(event));
    }
}

/// Keeps formatted lines in memory
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FallbackSink for CaptureSink {
    fn emit(&self, event: &TrackingEvent) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format_console_line(event));
    }
}
