//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No live client; the cycle cannot transmit
    #[error("no hub connection for '{hub}'")]
    NotConnected { hub: String },

    /// Client construction failed
    #[error("failed to connect to hub '{hub}'")]
    Connect {
        hub: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Hub refused to hand out a batch
    #[error("failed to create batch for hub '{hub}'")]
    CreateBatch {
        hub: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Batch transmission failed; its events stay queued
    #[error("failed to send batch of {events} events to hub '{hub}'")]
    SendBatch {
        hub: String,
        events: usize,
        #[source]
        source: contracts::ContractError,
    },

    /// Other contract error
    #[error("hub error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Message plus every `source()` below it, outermost first
    pub fn trace(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }
        chain
    }
}
