//! TrackingEvent - Collector input
//!
//! The record applications emit, and the envelope a formatted event travels
//! in once it is handed to a hub batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known event kinds
pub mod kinds {
    pub const EVENT: &str = "event";
    pub const TIMER: &str = "timer";
    pub const ERROR: &str = "error";
}

/// Application telemetry record
///
/// Immutable once handed to the collector; ownership moves into the
/// pending queue until the event is sent or dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Caller-assigned identifier (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Event kind, e.g. "event", "timer", "error"
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable label
    #[serde(default)]
    pub label: String,

    /// Start of the measured span
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// End of the measured span
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,

    /// Duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Occurrence count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Free-form context
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl TrackingEvent {
    /// Create an event of an arbitrary kind
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            label: label.into(),
            start: None,
            stop: None,
            duration: None,
            count: None,
            data: Map::new(),
        }
    }

    /// Create a plain "event" record
    pub fn event(label: impl Into<String>) -> Self {
        Self::new(kinds::EVENT, label)
    }

    /// Create a "timer" record with its duration in milliseconds
    pub fn timer(label: impl Into<String>, duration_ms: f64) -> Self {
        let mut event = Self::new(kinds::TIMER, label);
        event.duration = Some(duration_ms);
        event
    }

    /// Attach one context value
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach an identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Duration, only when strictly positive
    pub fn positive_duration(&self) -> Option<f64> {
        self.duration.filter(|d| *d > 0.0)
    }

    /// JSON form of the event, unchanged
    ///
    /// Same shape as the `Serialize` impl; string keys only, so it cannot fail.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// One formatted item as offered to a hub batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub body: Value,
}

impl EventData {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}
