use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use meeting_light_rs::{
    Actuator, DeviceNetwork, DeviceRegistry, EventStore, KasaError, LightDevice, LightState,
    MeetingLight, MemoryConfig, RetryPolicy,
};

/// In-memory bulb; clones share state.
#[derive(Debug, Clone)]
pub struct FakeLight {
    host: String,
    alias: String,
    state: Arc<Mutex<LightState>>,
}

impl FakeLight {
    pub fn new(host: &str, alias: &str, hue: u16) -> Self {
        Self {
            host: host.to_string(),
            alias: alias.to_string(),
            state: Arc::new(Mutex::new(LightState {
                light_on: true,
                hue,
                saturation: 100,
                brightness: 100,
                color_temp: 0,
            })),
        }
    }

    pub fn hue(&self) -> u16 {
        self.state.lock().unwrap().hue
    }
}

#[async_trait]
impl LightDevice for FakeLight {
    fn host(&self) -> &str {
        &self.host
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    async fn light_state(&self) -> Result<LightState, KasaError> {
        Ok(*self.state.lock().unwrap())
    }

    async fn set_hsv(&self, hue: u16, saturation: u8, brightness: u8) -> Result<(), KasaError> {
        let mut state = self.state.lock().unwrap();
        state.light_on = true;
        state.hue = hue;
        state.saturation = saturation;
        state.brightness = brightness;
        Ok(())
    }
}

pub struct FakeNetwork {
    lights: Vec<FakeLight>,
}

#[async_trait]
impl DeviceNetwork for FakeNetwork {
    type Device = FakeLight;

    async fn connect(&self, host: &str) -> Result<FakeLight, KasaError> {
        self.lights
            .iter()
            .find(|l| l.host == host)
            .cloned()
            .ok_or_else(|| KasaError::Connection(host.to_string(), "unreachable".to_string()))
    }

    async fn discover(&self) -> Result<Vec<FakeLight>, KasaError> {
        Ok(self.lights.clone())
    }
}

/// A service driving `lights`, looking for "Desk Lamp", with events in `events`.
pub fn fake_service(
    lights: Vec<FakeLight>,
    events: EventStore,
) -> MeetingLight<FakeNetwork, MemoryConfig> {
    let registry = DeviceRegistry::new(
        FakeNetwork { lights },
        MemoryConfig::with_identity(None, Some("Desk Lamp")),
    );
    let retry = RetryPolicy {
        attempts: 1,
        delay: std::time::Duration::ZERO,
    };
    MeetingLight::new(Actuator::new(registry, retry), events)
}
