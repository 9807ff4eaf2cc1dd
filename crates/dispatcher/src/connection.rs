//! Connection manager - owns the one live hub client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{HubClient, HubProvider};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;

/// Label used in logs when no hub name is configured
pub const UNCONFIGURED_HUB: &str = "<unconfigured>";

/// Owns the client handle and replaces it on demand
///
/// At most one client exists at a time. `live` mirrors whether one does, so
/// the collector can decide between queueing and console output without
/// awaiting.
pub struct ConnectionManager<P: HubProvider> {
    provider: P,
    name: Option<String>,
    connection: Option<String>,
    client: Option<P::Client>,
    live: Arc<AtomicBool>,
    connects: u64,
}

impl<P: HubProvider> ConnectionManager<P> {
    pub fn new(
        provider: P,
        name: Option<String>,
        connection: Option<String>,
        live: Arc<AtomicBool>,
    ) -> Self {
        Self {
            provider,
            name,
            connection,
            client: None,
            live,
            connects: 0,
        }
    }

    /// Hub name for logging
    pub fn hub(&self) -> &str {
        self.name.as_deref().unwrap_or(UNCONFIGURED_HUB)
    }

    /// Current client, if any
    pub fn client(&self) -> Option<&P::Client> {
        self.client.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    /// Successful client constructions so far
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Both a hub name and a connection string are configured
    pub fn has_credentials(&self) -> bool {
        self.name.is_some() && self.connection.is_some()
    }

    /// Replace the current client with a fresh one
    ///
    /// Missing name or connection only warns and leaves the manager without
    /// a client (fallback logging). A close failure on the old client is
    /// ignored. A construction failure is returned with no client in place.
    ///
    /// `live` stays set while the old client is swapped out, so events
    /// collected during a reconnect are queued rather than printed.
    #[instrument(name = "connection_manager_connect", skip(self), fields(hub = %self.hub()))]
    pub async fn connect(&mut self) -> Result<(), DispatcherError> {
        let (Some(name), Some(connection)) = (self.name.clone(), self.connection.clone()) else {
            warn!("A hub name and connection string are required. Logging to console instead.");
            self.close().await;
            return Ok(());
        };

        self.close_client().await;

        let client = match self.provider.connect(&connection, &name).await {
            Ok(client) => client,
            Err(source) => {
                self.live.store(false, Ordering::Release);
                return Err(DispatcherError::Connect { hub: name, source });
            }
        };

        self.client = Some(client);
        self.live.store(true, Ordering::Release);
        self.connects += 1;
        info!(hub = %name, connects = self.connects, "Hub client connected");
        Ok(())
    }

    /// Close and drop the current client, ignoring failures
    pub async fn close(&mut self) {
        self.live.store(false, Ordering::Release);
        self.close_client().await;
    }

    async fn close_client(&mut self) {
        if let Some(mut old) = self.client.take() {
            if let Err(e) = old.close().await {
                debug!(hub = %self.hub(), error = %e, "Ignoring close failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubs::{MemoryHub, MemoryHubProvider};
    use std::time::Duration;

    fn manager(
        hub: &MemoryHub,
        name: Option<&str>,
        connection: Option<&str>,
    ) -> (ConnectionManager<MemoryHubProvider>, Arc<AtomicBool>) {
        let live = Arc::new(AtomicBool::new(false));
        let manager = ConnectionManager::new(
            hub.provider(),
            name.map(String::from),
            connection.map(String::from),
            Arc::clone(&live),
        );
        (manager, live)
    }

    #[tokio::test]
    async fn test_connect_creates_client() {
        let hub = MemoryHub::new();
        let (mut manager, live) = manager(&hub, Some("hub"), Some("conn"));

        manager.connect().await.unwrap();

        assert!(manager.is_live());
        assert!(live.load(Ordering::Acquire));
        assert_eq!(hub.connects(), vec![("conn".to_string(), "hub".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_credentials_stay_offline() {
        let hub = MemoryHub::new();
        let (mut manager, live) = manager(&hub, Some("hub"), None);

        manager.connect().await.unwrap();

        assert!(!manager.is_live());
        assert!(!live.load(Ordering::Acquire));
        assert!(hub.connects().is_empty());
        assert!(!manager.has_credentials());
        assert_eq!(manager.hub(), "hub");
    }

    #[tokio::test]
    async fn test_reconnect_closes_old_client() {
        let hub = MemoryHub::new();
        let (mut manager, _) = manager(&hub, Some("hub"), Some("conn"));

        manager.connect().await.unwrap();
        manager.connect().await.unwrap();

        assert_eq!(hub.close_calls(), 1);
        assert_eq!(hub.connects().len(), 2);
        assert_eq!(manager.connects(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_held_while_reconnecting() {
        let hub = MemoryHub::new();
        let (mut manager, live) = manager(&hub, Some("hub"), Some("conn"));
        manager.connect().await.unwrap();
        hub.set_connect_delay(Duration::from_millis(200));

        let reconnect = tokio::spawn(async move {
            let result = manager.connect().await;
            (manager, result)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(live.load(Ordering::Acquire));
        assert_eq!(hub.close_calls(), 1);

        let (manager, result) = reconnect.await.unwrap();
        assert!(result.is_ok());
        assert!(manager.is_live());
        assert_eq!(hub.connects().len(), 2);
    }

    #[tokio::test]
    async fn test_close_clears_live() {
        let hub = MemoryHub::new();
        let (mut manager, live) = manager(&hub, Some("hub"), Some("conn"));
        manager.connect().await.unwrap();

        manager.close().await;

        assert!(!manager.is_live());
        assert!(!live.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_close_failure_does_not_block_reconnect() {
        let hub = MemoryHub::new();
        hub.set_fail_close(true);
        let (mut manager, _) = manager(&hub, Some("hub"), Some("conn"));

        manager.connect().await.unwrap();
        assert!(manager.connect().await.is_ok());

        assert!(manager.is_live());
        assert_eq!(hub.connects().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_no_client() {
        let hub = MemoryHub::new();
        let (mut manager, live) = manager(&hub, Some("hub"), Some("conn"));
        manager.connect().await.unwrap();

        hub.fail_next_connects(1);
        let err = manager.connect().await.unwrap_err();

        assert!(matches!(err, DispatcherError::Connect { .. }));
        assert!(!manager.is_live());
        assert!(!live.load(Ordering::Acquire));
        assert_eq!(hub.close_calls(), 1);
    }
}
