use tracing::{debug, info, warn};

use crate::device::config_store::{ALIAS_KEY, ConfigStore, DeviceIdentity, IP_KEY};
use crate::device::{DeviceNetwork, LightDevice};

/// Strips everything but word characters and lowercases, so that
/// "Office-Lamp " and "office lamp" compare equal.
pub fn normalize_alias(alias: &str) -> String {
    alias
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Outcome of checking the cached address.
#[derive(Debug)]
pub enum Verification<D> {
    Verified(D),
    /// Something answered, but under another alias.
    Mismatch(String),
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// Neither the store nor the configuration names the expected device.
    NoAlias,
    NoMatch,
    DiscoveryFailed(String),
}

#[derive(Debug)]
pub enum Resolution<D> {
    /// The cached address still answers with the expected alias.
    Cached(D),
    /// Found by a discovery scan; its address is now cached.
    Discovered(D),
    NotFound(ResolveFailure),
}

impl<D> Resolution<D> {
    pub fn into_device(self) -> Option<D> {
        match self {
            Resolution::Cached(d) | Resolution::Discovered(d) => Some(d),
            Resolution::NotFound(_) => None,
        }
    }
}

pub struct DeviceRegistry<N, S> {
    network: N,
    store: S,
    configured_alias: Option<String>,
}

impl<N, S> DeviceRegistry<N, S>
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    pub fn new(network: N, store: S) -> Self {
        Self {
            network,
            store,
            configured_alias: None,
        }
    }

    /// Alias used for discovery when the store does not hold one.
    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.configured_alias = alias.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub async fn resolve(&self) -> Resolution<N::Device> {
        let identity = DeviceIdentity::load(&self.store);

        if let (Some(ip), Some(alias)) = (&identity.ip, &identity.alias) {
            match self.verify(ip, alias).await {
                Verification::Verified(device) => {
                    debug!("Cached device at {} verified as '{}'", ip, alias);
                    return Resolution::Cached(device);
                }
                Verification::Mismatch(found) => {
                    info!(
                        "Device at {} answers as '{}' instead of '{}', rediscovering",
                        ip, found, alias
                    );
                }
                Verification::Unreachable(e) => {
                    info!("Cached device at {} unreachable ({}), rediscovering", ip, e);
                }
            }
        }

        let stored_alias = identity.alias.is_some();
        let Some(alias) = identity.alias.or_else(|| self.configured_alias.clone()) else {
            warn!("No device alias configured, cannot discover the light");
            return Resolution::NotFound(ResolveFailure::NoAlias);
        };

        match self.discover(&alias).await {
            Ok(Some(device)) => {
                self.remember(&device, &alias, !stored_alias);
                Resolution::Discovered(device)
            }
            Ok(None) => {
                warn!("No light named '{}' found on the network", alias);
                Resolution::NotFound(ResolveFailure::NoMatch)
            }
            Err(e) => {
                warn!("Discovery failed: {}", e);
                Resolution::NotFound(ResolveFailure::DiscoveryFailed(e.to_string()))
            }
        }
    }

    /// Connects to `ip` and checks that it answers with `alias`. Network
    /// errors count as a failed verification.
    pub async fn verify(&self, ip: &str, alias: &str) -> Verification<N::Device> {
        match self.network.connect(ip).await {
            Ok(device) if normalize_alias(device.alias()) == normalize_alias(alias) => {
                Verification::Verified(device)
            }
            Ok(device) => Verification::Mismatch(device.alias().to_string()),
            Err(e) => Verification::Unreachable(e.to_string()),
        }
    }

    async fn discover(&self, alias: &str) -> Result<Option<N::Device>, crate::KasaError> {
        let wanted = normalize_alias(alias);
        let devices = self.network.discover().await?;
        debug!("Discovery returned {} light(s)", devices.len());
        Ok(devices
            .into_iter()
            .find(|d| normalize_alias(d.alias()) == wanted))
    }

    fn remember(&self, device: &N::Device, alias: &str, store_alias: bool) {
        info!("Caching address {} for '{}'", device.host(), alias);
        if let Err(e) = self.store.set(IP_KEY, device.host()) {
            warn!("Failed to cache device address: {}", e);
        }
        if store_alias {
            if let Err(e) = self.store.set(ALIAS_KEY, alias) {
                warn!("Failed to cache device alias: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryConfig;
    use crate::test_helper::{FakeBulb, FakeNetwork};

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("Office-Lamp "), "officelamp");
        assert_eq!(normalize_alias("office lamp!"), "officelamp");
        assert_eq!(normalize_alias("Lamp_2"), "lamp_2");
    }

    #[tokio::test]
    async fn test_cached_address_verified() {
        let network = FakeNetwork::new(vec![FakeBulb::new("10.0.0.5", "Office Lamp")]);
        let store = MemoryConfig::with_identity(Some("10.0.0.5"), Some("office lamp"));
        let registry = DeviceRegistry::new(network.clone(), store);

        let resolution = registry.resolve().await;

        assert!(matches!(resolution, Resolution::Cached(_)));
        assert_eq!(network.discover_calls(), 0);
    }

    #[tokio::test]
    async fn test_alias_mismatch_falls_through_to_discovery() {
        let network = FakeNetwork::new(vec![
            FakeBulb::new("10.0.0.5", "Kitchen"),
            FakeBulb::new("10.0.0.9", "Office Lamp"),
        ]);
        let store = MemoryConfig::with_identity(Some("10.0.0.5"), Some("Office Lamp"));
        let registry = DeviceRegistry::new(network.clone(), store);

        let device = match registry.resolve().await {
            Resolution::Discovered(device) => device,
            other => panic!("expected discovery, got {other:?}"),
        };

        assert_eq!(device.host(), "10.0.0.9");
        assert_eq!(network.discover_calls(), 1);
        assert_eq!(registry.store().get(IP_KEY).as_deref(), Some("10.0.0.9"));
    }

    #[tokio::test]
    async fn test_unreachable_cache_falls_through_to_discovery() {
        let network = FakeNetwork::new(vec![FakeBulb::new("10.0.0.9", "Office Lamp")]);
        let store = MemoryConfig::with_identity(Some("10.0.0.5"), Some("Office Lamp"));
        let registry = DeviceRegistry::new(network.clone(), store);

        let resolution = registry.resolve().await;

        assert!(matches!(resolution, Resolution::Discovered(_)));
        assert_eq!(network.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_alias_is_not_found() {
        let network = FakeNetwork::new(vec![FakeBulb::new("10.0.0.9", "Office Lamp")]);
        let registry = DeviceRegistry::new(network.clone(), MemoryConfig::new());

        let resolution = registry.resolve().await;

        assert!(matches!(
            resolution,
            Resolution::NotFound(ResolveFailure::NoAlias)
        ));
        assert_eq!(network.discover_calls(), 0);
    }

    #[tokio::test]
    async fn test_configured_alias_is_persisted_after_discovery() {
        let network = FakeNetwork::new(vec![FakeBulb::new("10.0.0.9", "Office Lamp")]);
        let registry = DeviceRegistry::new(network, MemoryConfig::new())
            .with_alias(Some("office-lamp".to_string()));

        let resolution = registry.resolve().await;

        assert!(matches!(resolution, Resolution::Discovered(_)));
        let identity = DeviceIdentity::load(registry.store());
        assert_eq!(identity.ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(identity.alias.as_deref(), Some("office-lamp"));
    }

    #[tokio::test]
    async fn test_discovery_without_match() {
        let network = FakeNetwork::new(vec![FakeBulb::new("10.0.0.9", "Kitchen")]);
        let store = MemoryConfig::with_identity(None, Some("Office Lamp"));
        let registry = DeviceRegistry::new(network, store);

        let resolution = registry.resolve().await;

        assert!(matches!(
            resolution,
            Resolution::NotFound(ResolveFailure::NoMatch)
        ));
        assert_eq!(registry.store().get(IP_KEY), None);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_reported() {
        let network = FakeNetwork::failing_discovery();
        let store = MemoryConfig::with_identity(None, Some("Office Lamp"));
        let registry = DeviceRegistry::new(network, store);

        let resolution = registry.resolve().await;

        assert!(matches!(
            resolution,
            Resolution::NotFound(ResolveFailure::DiscoveryFailed(_))
        ));
    }
}
