//! MemoryHub - in-process hub with fault injection
//!
//! Records every batch it receives. Failures can be scheduled for connect,
//! create-batch, send, close and individual `try_add` calls, and connects can
//! be slowed down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{ContractError, EventBatch, EventData, HubClient, HubProvider};
use serde_json::Value;
use tracing::{debug, instrument};

use super::batch::JsonBatch;
use super::udp::DEFAULT_MAX_BATCH_BYTES;

#[derive(Debug, Default)]
struct State {
    max_batch_bytes: usize,
    batches: Vec<Vec<Value>>,
    connects: Vec<(String, String)>,
    create_calls: usize,
    send_calls: usize,
    close_calls: usize,
    try_add_calls: usize,
    refused_try_adds: Vec<usize>,
    failed_send_calls: Vec<usize>,
    fail_connects: usize,
    fail_creates: usize,
    fail_sends: usize,
    fail_close: bool,
    connect_delay: Duration,
}

/// Shared hub state; clones observe the same hub
#[derive(Debug, Clone)]
pub struct MemoryHub {
    state: Arc<Mutex<State>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::with_max_batch_bytes(DEFAULT_MAX_BATCH_BYTES)
    }

    pub fn with_max_batch_bytes(max_batch_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                max_batch_bytes,
                ..State::default()
            })),
        }
    }

    /// Provider handing out clients of this hub
    pub fn provider(&self) -> MemoryHubProvider {
        MemoryHubProvider { hub: self.clone() }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Fault injection =====

    /// Fail the next `n` provider connects
    pub fn fail_next_connects(&self, n: usize) {
        self.state().fail_connects = n;
    }

    /// Fail the next `n` create-batch calls
    pub fn fail_next_creates(&self, n: usize) {
        self.state().fail_creates = n;
    }

    /// Fail the next `n` send calls
    pub fn fail_next_sends(&self, n: usize) {
        self.state().fail_sends = n;
    }

    /// Fail the `call`-th send (1-based)
    pub fn fail_send_call(&self, call: usize) {
        self.state().failed_send_calls.push(call);
    }

    /// Make every close fail
    pub fn set_fail_close(&self, fail: bool) {
        self.state().fail_close = fail;
    }

    /// Delay every provider connect by `delay`
    pub fn set_connect_delay(&self, delay: Duration) {
        self.state().connect_delay = delay;
    }

    /// Refuse the `call`-th `try_add` (1-based, counted across all batches)
    pub fn refuse_try_add_call(&self, call: usize) {
        self.state().refused_try_adds.push(call);
    }

    // ===== Inspection =====

    /// Event bodies of every received batch, in arrival order
    pub fn sent_batches(&self) -> Vec<Vec<Value>> {
        self.state().batches.clone()
    }

    /// All received event bodies, flattened
    pub fn sent_events(&self) -> Vec<Value> {
        self.state().batches.iter().flatten().cloned().collect()
    }

    /// `(connection, name)` of every successful connect
    pub fn connects(&self) -> Vec<(String, String)> {
        self.state().connects.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn send_calls(&self) -> usize {
        self.state().send_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    pub fn try_add_calls(&self) -> usize {
        self.state().try_add_calls
    }

    /// Whether the current `try_add` call should be refused
    fn admit_try_add(&self) -> bool {
        let mut state = self.state();
        state.try_add_calls += 1;
        let call = state.try_add_calls;
        !state.refused_try_adds.contains(&call)
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch handed out by a MemoryClient
#[derive(Debug)]
pub struct MemoryBatch {
    inner: JsonBatch,
    hub: MemoryHub,
}

impl EventBatch for MemoryBatch {
    fn try_add(&mut self, item: EventData) -> bool {
        self.hub.admit_try_add() && self.inner.try_add(item)
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn size_in_bytes(&self) -> usize {
        self.inner.size_in_bytes()
    }

    fn max_size_in_bytes(&self) -> usize {
        self.inner.max_size_in_bytes()
    }
}

/// Client connected to a MemoryHub
#[derive(Debug)]
pub struct MemoryClient {
    name: String,
    hub: MemoryHub,
    closed: bool,
}

impl MemoryClient {
    fn ensure_open(&self) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::send(&self.name, "client is closed"));
        }
        Ok(())
    }
}

impl HubClient for MemoryClient {
    type Batch = MemoryBatch;

    fn name(&self) -> &str {
        &self.name
    }

    async fn create_batch(&self) -> Result<MemoryBatch, ContractError> {
        self.ensure_open()?;
        let mut state = self.hub.state();
        state.create_calls += 1;
        if state.fail_creates > 0 {
            state.fail_creates -= 1;
            return Err(ContractError::batch_create(&self.name, "injected failure"));
        }
        Ok(MemoryBatch {
            inner: JsonBatch::array(state.max_batch_bytes),
            hub: self.hub.clone(),
        })
    }

    #[instrument(
        name = "memory_hub_send",
        skip(self, batch),
        fields(hub = %self.name, events = batch.count())
    )]
    async fn send_batch(&self, batch: MemoryBatch) -> Result<(), ContractError> {
        self.ensure_open()?;
        let mut state = self.hub.state();
        state.send_calls += 1;
        let call = state.send_calls;
        if state.fail_sends > 0 || state.failed_send_calls.contains(&call) {
            state.fail_sends = state.fail_sends.saturating_sub(1);
            return Err(ContractError::send(&self.name, "injected failure"));
        }
        state.batches.push(batch.inner.into_bodies());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        let mut state = self.hub.state();
        state.close_calls += 1;
        if state.fail_close {
            return Err(ContractError::close(&self.name, "injected failure"));
        }
        debug!(hub = %self.name, "MemoryHub client closed");
        Ok(())
    }
}

/// Provider for MemoryHub clients
#[derive(Debug, Clone, Default)]
pub struct MemoryHubProvider {
    hub: MemoryHub,
}

impl MemoryHubProvider {
    pub fn hub(&self) -> &MemoryHub {
        &self.hub
    }
}

impl HubProvider for MemoryHubProvider {
    type Client = MemoryClient;

    async fn connect(&self, connection: &str, name: &str) -> Result<MemoryClient, ContractError> {
        let delay = self.hub.state().connect_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.hub.state();
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(ContractError::hub_connection(name, "injected failure"));
        }
        state.connects.push((connection.to_string(), name.to_string()));
        Ok(MemoryClient {
            name: name.to_string(),
            hub: self.hub.clone(),
            closed: false,
        })
    }
}
