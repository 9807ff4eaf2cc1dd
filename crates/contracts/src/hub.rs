//! Hub capability traits - Dispatcher output interface
//!
//! A hub transport is reached only through these traits. The provider builds
//! a client from a connection string and hub name; the client hands out
//! size-bounded batches and transmits them.

use crate::{ContractError, EventData};

/// One size-bounded transmission unit
pub trait EventBatch {
    /// Try to append one item
    ///
    /// Returns `false` when the item does not fit; the batch is unchanged.
    fn try_add(&mut self, item: EventData) -> bool;

    /// Number of accepted items
    fn count(&self) -> usize;

    /// Bytes used so far
    fn size_in_bytes(&self) -> usize;

    /// Byte limit imposed by the hub
    fn max_size_in_bytes(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Live connection to a hub
#[trait_variant::make(HubClient: Send)]
pub trait LocalHubClient {
    type Batch: EventBatch + Send;

    /// Hub name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Request an empty batch
    async fn create_batch(&self) -> Result<Self::Batch, ContractError>;

    /// Transmit a batch
    ///
    /// # Errors
    /// Any transport failure; the caller keeps the items queued.
    async fn send_batch(&self, batch: Self::Batch) -> Result<(), ContractError>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Construction strategy for hub clients
#[trait_variant::make(HubProvider: Send)]
pub trait LocalHubProvider {
    type Client: HubClient + Send + Sync + 'static;

    /// Build a fresh client for `name` using `connection`
    async fn connect(&self, connection: &str, name: &str) -> Result<Self::Client, ContractError>;
}
