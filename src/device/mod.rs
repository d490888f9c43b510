mod actuator;
mod config_store;
mod registry;

pub use actuator::{Actuation, Actuator, RetryPolicy};
pub use config_store::{
    ALIAS_KEY, ConfigStore, DeviceIdentity, IP_KEY, JsonConfigFile, MemoryConfig, StoreError,
};
pub use registry::{DeviceRegistry, ResolveFailure, Resolution, Verification, normalize_alias};

use async_trait::async_trait;

use crate::protocol::client::{KasaBulb, KasaError, KasaOptions};
use crate::protocol::messages::LightState;
use crate::protocol::scanner::Scanner;

/// A bulb the registry handed out. Only light control is required of it.
#[async_trait]
pub trait LightDevice: Send + Sync {
    fn host(&self) -> &str;

    /// Alias as reported when the handle was obtained.
    fn alias(&self) -> &str;

    async fn light_state(&self) -> Result<LightState, KasaError>;

    async fn set_hsv(&self, hue: u16, saturation: u8, brightness: u8) -> Result<(), KasaError>;
}

/// Network-level access to bulbs: direct connection and discovery.
#[async_trait]
pub trait DeviceNetwork: Send + Sync {
    type Device: LightDevice + 'static;

    async fn connect(&self, host: &str) -> Result<Self::Device, KasaError>;

    async fn discover(&self) -> Result<Vec<Self::Device>, KasaError>;
}

#[async_trait]
impl LightDevice for KasaBulb {
    fn host(&self) -> &str {
        KasaBulb::host(self)
    }

    fn alias(&self) -> &str {
        KasaBulb::alias(self)
    }

    async fn light_state(&self) -> Result<LightState, KasaError> {
        KasaBulb::light_state(self).await
    }

    async fn set_hsv(&self, hue: u16, saturation: u8, brightness: u8) -> Result<(), KasaError> {
        KasaBulb::set_hsv(self, hue, saturation, brightness).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct KasaNetwork {
    options: KasaOptions,
}

impl KasaNetwork {
    pub fn new(options: KasaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &KasaOptions {
        &self.options
    }
}

#[async_trait]
impl DeviceNetwork for KasaNetwork {
    type Device = KasaBulb;

    async fn connect(&self, host: &str) -> Result<KasaBulb, KasaError> {
        KasaBulb::connect(host, self.options.clone()).await
    }

    async fn discover(&self) -> Result<Vec<KasaBulb>, KasaError> {
        Scanner::scan(&self.options).await
    }
}
