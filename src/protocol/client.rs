use crate::protocol::cipher::{read_frame, write_frame};
use crate::protocol::messages::{
    LIGHTING_MODULE, LightState, SysInfo, TRANSITION_LIGHT_STATE, extract_result,
    make_sysinfo_message, make_transition_message,
};
use derive_builder::Builder;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 9999;
pub const BROADCAST_TARGET: &str = "255.255.255.255:9999";

#[derive(Error, Debug)]
pub enum KasaError {
    #[error("Connection to {0} failed: {1}")]
    Connection(String, String),
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    Protocol(String),
    #[error("Device returned error {code}: {msg}")]
    Device { code: i64, msg: String },
    #[error("Device at {0} has no light control")]
    NotALight(String),
}

#[derive(Builder, Debug, Clone)]
pub struct KasaOptions {
    #[builder(default = "DEFAULT_PORT")]
    pub port: u16,
    /// Upper bound for a single connect/request/response exchange.
    #[builder(default = "Duration::from_secs(5)")]
    pub timeout: Duration,
    #[builder(default = "Duration::from_secs(3)")]
    pub discovery_timeout: Duration,
    #[builder(default = "BROADCAST_TARGET.to_string()")]
    pub discovery_target: String,
}

impl KasaOptions {
    pub fn builder() -> KasaOptionsBuilder {
        KasaOptionsBuilder::default()
    }
}

impl Default for KasaOptions {
    fn default() -> Self {
        KasaOptions {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(3),
            discovery_target: BROADCAST_TARGET.to_string(),
        }
    }
}

/// A smart bulb reachable on the local network.
///
/// Every call opens a fresh TCP connection; the bulb closes idle sockets
/// quickly, so there is nothing worth keeping open between requests.
#[derive(Debug, Clone)]
pub struct KasaBulb {
    host: String,
    options: KasaOptions,
    info: SysInfo,
}

impl KasaBulb {
    /// Connects to `host` and reads its sysinfo.
    pub async fn connect(host: &str, options: KasaOptions) -> Result<Self, KasaError> {
        let info = query_sysinfo(host, &options).await?;
        Ok(Self::from_sysinfo(host, options, info))
    }

    pub(crate) fn from_sysinfo(host: &str, options: KasaOptions, info: SysInfo) -> Self {
        KasaBulb {
            host: host.to_string(),
            options,
            info,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn alias(&self) -> &str {
        &self.info.alias
    }

    pub fn sysinfo(&self) -> &SysInfo {
        &self.info
    }

    /// Reads the live light state from the bulb.
    pub async fn light_state(&self) -> Result<LightState, KasaError> {
        let info = query_sysinfo(&self.host, &self.options).await?;
        info.light_state
            .as_ref()
            .map(LightState::from)
            .ok_or_else(|| KasaError::NotALight(self.host.clone()))
    }

    pub async fn set_hsv(&self, hue: u16, saturation: u8, brightness: u8) -> Result<(), KasaError> {
        let response = send_request(
            &self.host,
            &self.options,
            &make_transition_message(hue, saturation, brightness),
        )
        .await?;
        extract_result(&response, LIGHTING_MODULE, TRANSITION_LIGHT_STATE)?;
        debug!(host = %self.host, hue, saturation, brightness, "Light state transitioned");
        Ok(())
    }
}

async fn query_sysinfo(host: &str, options: &KasaOptions) -> Result<SysInfo, KasaError> {
    let response = send_request(host, options, &make_sysinfo_message()).await?;
    SysInfo::from_response(&response)
}

/// Sends one request and waits for its reply, bounded by the configured timeout.
pub async fn send_request(
    host: &str,
    options: &KasaOptions,
    request: &Value,
) -> Result<Value, KasaError> {
    let addr = format!("{host}:{}", options.port);
    let payload = serde_json::to_vec(request)?;
    let exchange = async {
        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| KasaError::Connection(addr.clone(), e.to_string()))?;
        write_frame(&mut stream, &payload).await?;
        let reply = read_frame(&mut stream).await?;
        Ok::<_, KasaError>(serde_json::from_slice::<Value>(&reply)?)
    };
    timeout(options.timeout, exchange)
        .await
        .map_err(|_| KasaError::Timeout(addr.clone()))?
}
