//! Layered error definitions
//!
//! Categorized by source: config / hub / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Hub Errors =====
    /// Client construction failed
    #[error("hub '{hub}' connection error: {message}")]
    HubConnection { hub: String, message: String },

    /// Hub refused to hand out a batch
    #[error("hub '{hub}' batch creation error: {message}")]
    BatchCreate { hub: String, message: String },

    /// Batch transmission failed
    #[error("hub '{hub}' send error: {message}")]
    Send { hub: String, message: String },

    /// Client close failed
    #[error("hub '{hub}' close error: {message}")]
    Close { hub: String, message: String },

    /// No live client to transmit with
    #[error("no hub connection available")]
    NotConnected,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create hub connection error
    pub fn hub_connection(hub: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HubConnection {
            hub: hub.into(),
            message: message.into(),
        }
    }

    /// Create batch creation error
    pub fn batch_create(hub: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BatchCreate {
            hub: hub.into(),
            message: message.into(),
        }
    }

    /// Create send error
    pub fn send(hub: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            hub: hub.into(),
            message: message.into(),
        }
    }

    /// Create close error
    pub fn close(hub: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Close {
            hub: hub.into(),
            message: message.into(),
        }
    }
}
