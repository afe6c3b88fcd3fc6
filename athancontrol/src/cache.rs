//! Rolling list of speaker addresses.
//!
//! Readers clone an `Arc` under a read lock; a successful discovery swaps in
//! a new list. Lists are never merged.

use crate::discovery::DeviceDiscovery;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Discovery found devices, the cache now holds exactly these
    Updated(usize),
    /// Discovery failed or found nothing, previous list kept
    Kept,
}

#[derive(Debug, Default)]
pub struct DeviceAddressCache {
    discovered: RwLock<Arc<Vec<String>>>,
    fallback: RwLock<Arc<Vec<String>>>,
}

impl DeviceAddressCache {
    pub fn new(fallback: Vec<String>) -> Self {
        Self {
            discovered: RwLock::new(Arc::new(Vec::new())),
            fallback: RwLock::new(Arc::new(fallback)),
        }
    }

    /// Runs one discovery and replaces the list when it found something.
    pub async fn refresh(&self, discovery: &dyn DeviceDiscovery) -> RefreshOutcome {
        match discovery.discover().await {
            Ok(addresses) if !addresses.is_empty() => {
                let count = addresses.len();
                self.replace(addresses);
                info!("🔄 Device cache updated with {} address(es)", count);
                RefreshOutcome::Updated(count)
            }
            Ok(_) => {
                warn!(
                    "⚠️ Discovery found no device, keeping {} cached address(es)",
                    self.discovered.read().len()
                );
                RefreshOutcome::Kept
            }
            Err(e) => {
                warn!("⚠️ Discovery failed ({}), keeping cached addresses", e);
                RefreshOutcome::Kept
            }
        }
    }

    /// Addresses to broadcast to: the discovered list, or the fallback list
    /// in configured order when nothing was discovered yet.
    pub fn current(&self) -> Arc<Vec<String>> {
        let discovered = Arc::clone(&self.discovered.read());
        if !discovered.is_empty() {
            return discovered;
        }
        Arc::clone(&self.fallback.read())
    }

    pub fn discovered(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.discovered.read())
    }

    pub fn set_fallback(&self, fallback: Vec<String>) {
        *self.fallback.write() = Arc::new(fallback);
    }

    fn replace(&self, addresses: Vec<String>) {
        *self.discovered.write() = Arc::new(addresses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ControlError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Plays back a scripted list of discovery results
    struct Scripted(Mutex<VecDeque<Result<Vec<String>, ControlError>>>);

    impl Scripted {
        fn new(results: Vec<Result<Vec<String>, ControlError>>) -> Self {
            Self(Mutex::new(results.into()))
        }
    }

    #[async_trait]
    impl DeviceDiscovery for Scripted {
        async fn discover(&self) -> Result<Vec<String>, ControlError> {
            self.0.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn failure() -> ControlError {
        ControlError::Discovery(athanupnp::ssdp::SsdpError::Io(std::io::Error::other("no route")))
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let cache = DeviceAddressCache::new(Vec::new());
        let discovery = Scripted::new(vec![Ok(addrs(&["A", "B"])), Err(failure())]);

        assert_eq!(cache.refresh(&discovery).await, RefreshOutcome::Updated(2));
        assert_eq!(cache.refresh(&discovery).await, RefreshOutcome::Kept);
        assert_eq!(*cache.current(), addrs(&["A", "B"]));
    }

    #[tokio::test]
    async fn test_empty_refresh_keeps_previous_list() {
        let cache = DeviceAddressCache::new(Vec::new());
        let discovery = Scripted::new(vec![Ok(addrs(&["A", "B"])), Ok(Vec::new())]);

        cache.refresh(&discovery).await;
        assert_eq!(cache.refresh(&discovery).await, RefreshOutcome::Kept);
        assert_eq!(*cache.current(), addrs(&["A", "B"]));
    }

    #[tokio::test]
    async fn test_refresh_replaces_instead_of_merging() {
        let cache = DeviceAddressCache::new(Vec::new());
        let discovery = Scripted::new(vec![Ok(addrs(&["A", "B"])), Ok(addrs(&["C"]))]);

        cache.refresh(&discovery).await;
        cache.refresh(&discovery).await;
        assert_eq!(*cache.current(), addrs(&["C"]));
    }

    #[test]
    fn test_fallback_when_nothing_discovered() {
        let cache = DeviceAddressCache::new(addrs(&["10.0.0.9", "10.0.0.4"]));
        assert_eq!(*cache.current(), addrs(&["10.0.0.9", "10.0.0.4"]));

        cache.set_fallback(addrs(&["10.0.0.7"]));
        assert_eq!(*cache.current(), addrs(&["10.0.0.7"]));
    }

    #[tokio::test]
    async fn test_discovered_list_wins_over_fallback() {
        let cache = DeviceAddressCache::new(addrs(&["F"]));
        let discovery = Scripted::new(vec![Ok(addrs(&["A"]))]);
        cache.refresh(&discovery).await;
        assert_eq!(*cache.current(), addrs(&["A"]));
    }
}
