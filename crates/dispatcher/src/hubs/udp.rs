//! UdpHub - one JSON datagram per batch
//!
//! Connection string: `Endpoint=udp://host:port;MaxBatchBytes=N`.
//! Each batch goes out as `{"events":[...],"hub":"<name>"}` and never
//! exceeds `MaxBatchBytes`.

use std::net::SocketAddr;

use contracts::{ContractError, EventBatch, HubClient, HubProvider};
use serde_json::json;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, instrument};

use super::batch::JsonBatch;

/// Default batch byte limit
pub const DEFAULT_MAX_BATCH_BYTES: usize = 65000;

/// Largest UDP payload over IPv4
const MAX_DATAGRAM_BYTES: usize = 65507;

/// Parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpHubConfig {
    /// `host:port` target
    pub endpoint: String,
    /// Byte limit per batch
    pub max_batch_bytes: usize,
}

impl UdpHubConfig {
    /// Parse `Endpoint=udp://host:port[;MaxBatchBytes=N]`
    ///
    /// Keys are case-insensitive; unknown keys are ignored.
    pub fn from_connection_string(connection: &str) -> Result<Self, String> {
        let mut endpoint = None;
        let mut max_batch_bytes = DEFAULT_MAX_BATCH_BYTES;

        for part in connection.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| format!("malformed segment '{}'", part))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => {
                    let target = value
                        .trim()
                        .strip_prefix("udp://")
                        .ok_or_else(|| format!("endpoint '{}' is not udp://", value))?;
                    let target = target.trim_end_matches('/');
                    if target.is_empty() {
                        return Err("endpoint has no host".to_string());
                    }
                    endpoint = Some(target.to_string());
                }
                "maxbatchbytes" => {
                    max_batch_bytes = value
                        .trim()
                        .parse()
                        .map_err(|e| format!("invalid MaxBatchBytes '{}': {}", value, e))?;
                }
                _ => {}
            }
        }

        if max_batch_bytes == 0 || max_batch_bytes > MAX_DATAGRAM_BYTES {
            return Err(format!(
                "MaxBatchBytes must be within 1..={}, got {}",
                MAX_DATAGRAM_BYTES, max_batch_bytes
            ));
        }

        Ok(Self {
            endpoint: endpoint.ok_or_else(|| "missing 'Endpoint' segment".to_string())?,
            max_batch_bytes,
        })
    }
}

/// Default provider: resolves the endpoint and binds an ephemeral socket
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpHubProvider;

impl HubProvider for UdpHubProvider {
    type Client = UdpClient;

    #[instrument(name = "udp_hub_connect", skip(self, connection))]
    async fn connect(&self, connection: &str, name: &str) -> Result<UdpClient, ContractError> {
        let config = UdpHubConfig::from_connection_string(connection)
            .map_err(|e| ContractError::hub_connection(name, e))?;
        UdpClient::connect(name, config).await
    }
}

/// Client sending batches to one UDP endpoint
#[derive(Debug)]
pub struct UdpClient {
    name: String,
    config: UdpHubConfig,
    envelope_bytes: usize,
    socket: Option<UdpSocket>,
}

impl UdpClient {
    /// Resolve, bind and connect
    pub async fn connect(name: impl Into<String>, config: UdpHubConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let connect_err = |e: std::io::Error| ContractError::hub_connection(&name, e.to_string());

        let target: SocketAddr = lookup_host(config.endpoint.as_str())
            .await
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                ContractError::hub_connection(&name, format!("'{}' did not resolve", config.endpoint))
            })?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await.map_err(connect_err)?;
        socket.connect(target).await.map_err(connect_err)?;

        let envelope_bytes = serde_json::to_vec(&json!({ "events": [], "hub": name }))
            .map_err(|e| ContractError::hub_connection(&name, e.to_string()))?
            .len();

        debug!(hub = %name, target = %target, "UdpHub connected");

        Ok(Self {
            name,
            config,
            envelope_bytes,
            socket: Some(socket),
        })
    }

    pub fn config(&self) -> &UdpHubConfig {
        &self.config
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::send(&self.name, "socket not connected"))
    }
}

impl HubClient for UdpClient {
    type Batch = JsonBatch;

    fn name(&self) -> &str {
        &self.name
    }

    async fn create_batch(&self) -> Result<JsonBatch, ContractError> {
        self.socket()
            .map_err(|_| ContractError::batch_create(&self.name, "socket not connected"))?;
        Ok(JsonBatch::new(self.config.max_batch_bytes, self.envelope_bytes))
    }

    #[instrument(
        name = "udp_hub_send",
        skip(self, batch),
        fields(hub = %self.name, events = batch.count(), bytes = batch.size_in_bytes())
    )]
    async fn send_batch(&self, batch: JsonBatch) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let datagram = json!({ "events": batch.into_bodies(), "hub": self.name });
        let data = serde_json::to_vec(&datagram)
            .map_err(|e| ContractError::send(&self.name, format!("json error: {}", e)))?;

        let sent = socket
            .send(&data)
            .await
            .map_err(|e| ContractError::send(&self.name, e.to_string()))?;
        if sent != data.len() {
            return Err(ContractError::send(
                &self.name,
                format!("short send: {} of {} bytes", sent, data.len()),
            ));
        }

        debug!(hub = %self.name, bytes = sent, "Sent");
        Ok(())
    }

    #[instrument(name = "udp_hub_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(hub = %self.name, "UdpHub closed");
        Ok(())
    }
}
