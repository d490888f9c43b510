use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::device::{DeviceNetwork, LightDevice};
use crate::protocol::cipher::{read_frame, write_frame};
use crate::protocol::client::KasaError;
use crate::protocol::messages::{LIGHTING_MODULE, LightState, TRANSITION_LIGHT_STATE};

/// In-memory bulb recording every color write.
#[derive(Debug, Clone)]
pub struct FakeBulb {
    host: String,
    alias: String,
    state: Arc<Mutex<LightState>>,
    set_calls: Arc<Mutex<Vec<(u16, u8, u8)>>>,
    failures_left: Arc<AtomicU32>,
    in_flight: Arc<AtomicU32>,
    max_in_flight: Arc<AtomicU32>,
    read_delay: Duration,
}

#[allow(dead_code)]
impl FakeBulb {
    pub fn new(host: &str, alias: &str) -> Self {
        Self {
            host: host.to_string(),
            alias: alias.to_string(),
            state: Arc::new(Mutex::new(LightState {
                light_on: true,
                hue: 120,
                saturation: 100,
                brightness: 100,
                color_temp: 0,
            })),
            set_calls: Arc::default(),
            failures_left: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
            read_delay: Duration::ZERO,
        }
    }

    pub fn with_hue(self, hue: u16) -> Self {
        self.state.lock().unwrap().hue = hue;
        self
    }

    /// Every state read takes `delay` before answering.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// The next `n` color writes fail.
    pub fn failing_times(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn set_calls(&self) -> Vec<(u16, u8, u8)> {
        self.set_calls.lock().unwrap().clone()
    }

    pub fn light_state_now(&self) -> LightState {
        *self.state.lock().unwrap()
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LightDevice for FakeBulb {
    fn host(&self) -> &str {
        &self.host
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    async fn light_state(&self) -> Result<LightState, KasaError> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        Ok(*self.state.lock().unwrap())
    }

    async fn set_hsv(&self, hue: u16, saturation: u8, brightness: u8) -> Result<(), KasaError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.set_calls
            .lock()
            .unwrap()
            .push((hue, saturation, brightness));
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(KasaError::Timeout(self.host.clone()));
        }
        let mut state = self.state.lock().unwrap();
        state.light_on = true;
        state.hue = hue;
        state.saturation = saturation;
        state.brightness = brightness;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeNetwork {
    devices: Arc<Vec<FakeBulb>>,
    fail_discovery: Arc<AtomicBool>,
    connect_calls: Arc<AtomicU32>,
    discover_calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl FakeNetwork {
    pub fn new(devices: Vec<FakeBulb>) -> Self {
        Self {
            devices: Arc::new(devices),
            ..Default::default()
        }
    }

    pub fn failing_discovery() -> Self {
        Self {
            fail_discovery: Arc::new(AtomicBool::new(true)),
            ..Default::default()
        }
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn discover_calls(&self) -> u32 {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceNetwork for FakeNetwork {
    type Device = FakeBulb;

    async fn connect(&self, host: &str) -> Result<FakeBulb, KasaError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.devices
            .iter()
            .find(|d| d.host == host)
            .cloned()
            .ok_or_else(|| KasaError::Connection(host.to_string(), "refused".to_string()))
    }

    async fn discover(&self) -> Result<Vec<FakeBulb>, KasaError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(KasaError::Io(std::io::Error::other("network down")));
        }
        Ok(self.devices.as_ref().clone())
    }
}

/// TCP server speaking the bulb protocol, for exercising the real client.
pub struct MockBulbServer {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockBulbServer {
    pub async fn start(alias: &str, hue: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests: Arc<Mutex<Vec<Value>>> = Arc::default();
        let state = Arc::new(Mutex::new(json!({
            "on_off": 1, "mode": "normal", "hue": hue, "saturation": 100, "color_temp": 0, "brightness": 100
        })));
        let alias = alias.to_string();
        let recorded = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Ok(frame) = read_frame(&mut stream).await else {
                    continue;
                };
                let request: Value = serde_json::from_slice(&frame).unwrap();
                recorded.lock().unwrap().push(request.clone());
                let reply = if let Some(transition) =
                    request[LIGHTING_MODULE].get(TRANSITION_LIGHT_STATE)
                {
                    let mut light = state.lock().unwrap();
                    for key in ["hue", "saturation", "brightness", "on_off"] {
                        light[key] = transition[key].clone();
                    }
                    let mut result = light.clone();
                    result["err_code"] = json!(0);
                    json!({ LIGHTING_MODULE: { TRANSITION_LIGHT_STATE: result } })
                } else {
                    let light = state.lock().unwrap().clone();
                    json!({"system": {"get_sysinfo": {
                        "alias": alias,
                        "mic_type": "IOT.SMARTBULB",
                        "light_state": light,
                        "err_code": 0
                    }}})
                };
                let _ = write_frame(&mut stream, &serde_json::to_vec(&reply).unwrap()).await;
            }
        });

        Self { port, requests }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}
