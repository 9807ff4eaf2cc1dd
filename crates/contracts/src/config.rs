//! HubConfig - Config Loader output
//!
//! Describes which hub to reach and how the dispatcher paces itself.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Default flush tick, in milliseconds
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Dispatcher construction configuration
///
/// `name` and `connection` are both required for live operation; when either
/// is missing the dispatcher runs in fallback-logging mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HubConfig {
    /// Hub identifier
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,

    /// Connection credential
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub connection: Option<String>,

    /// Scheduler tick
    #[serde(default = "default_flush_interval_ms")]
    #[validate(range(min = 1))]
    pub flush_interval_ms: u64,

    /// Pending queue cap (None = unbounded)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_queue_len: Option<usize>,
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl HubConfig {
    /// Config for a named hub
    pub fn new(name: impl Into<String>, connection: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            connection: Some(connection.into()),
            ..Self::default()
        }
    }

    /// Both name and connection are present
    pub fn is_live(&self) -> bool {
        self.name.is_some() && self.connection.is_some()
    }

    pub fn with_flush_interval_ms(mut self, ms: u64) -> Self {
        self.flush_interval_ms = ms;
        self
    }

    pub fn with_max_queue_len(mut self, len: usize) -> Self {
        self.max_queue_len = Some(len);
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: None,
            connection: None,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            max_queue_len: None,
        }
    }
}
