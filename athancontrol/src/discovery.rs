use crate::errors::ControlError;
use async_trait::async_trait;
use athanupnp::ssdp::SsdpClient;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Source of the speaker addresses currently on the network
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Addresses found during one bounded search, in discovery order,
    /// without duplicates. An empty list is a valid answer.
    async fn discover(&self) -> Result<Vec<String>, ControlError>;
}

/// SSDP M-SEARCH discovery of ZonePlayers
#[derive(Debug, Clone)]
pub struct SsdpDiscovery {
    search_target: String,
    window: Duration,
}

impl SsdpDiscovery {
    pub fn new(search_target: impl Into<String>, window: Duration) -> Self {
        Self {
            search_target: search_target.into(),
            window,
        }
    }
}

#[async_trait]
impl DeviceDiscovery for SsdpDiscovery {
    async fn discover(&self) -> Result<Vec<String>, ControlError> {
        let client = SsdpClient::new()?;
        let responses = client.search(&self.search_target, self.window).await?;

        let hosts = responses.iter().filter_map(|r| {
            let host = r.host();
            if host.is_none() {
                debug!("Unusable LOCATION from {}: {}", r.from, r.location);
            }
            host
        });
        let addresses = dedupe_preserving_order(hosts);

        info!("🔎 Discovered {} speaker(s): {:?}", addresses.len(), addresses);
        Ok(addresses)
    }
}

/// Keeps the first occurrence of every address
pub fn dedupe_preserving_order<I>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}
