use std::time::Duration;

use anyhow::Result;
use meeting_light_rs::{
    Actuator, DeviceRegistry, EventStore, JsonConfigFile, KasaMeetingLight, KasaNetwork,
    KasaOptions, MeetingLight, RetryPolicy, UPCOMING_THRESHOLD_MINUTES, upcoming_threshold,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Bulb name used when the device cache has none.
    pub alias: Option<String>,
    pub config_file: String,
    pub events_file: String,
    pub port: u16,
    /// Seconds between reconciliation passes, 0 disables polling.
    pub poll_interval_secs: u64,
    pub upcoming_threshold_minutes: i64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub discovery_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            alias: None,
            config_file: String::from("config.json"),
            events_file: String::from("events.json"),
            port: 5000,
            poll_interval_secs: 60,
            upcoming_threshold_minutes: UPCOMING_THRESHOLD_MINUTES,
            retry_attempts: 3,
            retry_delay_ms: 500,
            timeout_secs: 5,
            discovery_timeout_secs: 3,
        }
    }
}

impl Settings {
    /// Reads the settings file. An unreadable or invalid file falls back to
    /// the defaults.
    pub fn load(path: Option<&str>) -> Settings {
        let Some(path) = path else {
            return Settings::default();
        };
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Invalid settings file {}: {}, using default settings", path, e);
                Settings::default()
            }),
            Err(e) => {
                warn!("Failed to read settings file {}: {}, using default settings", path, e);
                Settings::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Out-of-range values fall back to the default threshold.
    pub fn upcoming_threshold(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.upcoming_threshold_minutes).unwrap_or_else(|| {
            warn!(
                "upcoming_threshold_minutes {} is out of range, using {}",
                self.upcoming_threshold_minutes, UPCOMING_THRESHOLD_MINUTES
            );
            upcoming_threshold()
        })
    }

    pub fn kasa_options(&self) -> Result<KasaOptions> {
        Ok(KasaOptions::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .discovery_timeout(Duration::from_secs(self.discovery_timeout_secs))
            .build()?)
    }

    pub fn build_service(&self) -> Result<KasaMeetingLight> {
        let registry = DeviceRegistry::new(
            KasaNetwork::new(self.kasa_options()?),
            JsonConfigFile::new(&self.config_file),
        )
        .with_alias(self.alias.clone());
        let actuator = Actuator::new(registry, self.retry_policy());
        Ok(MeetingLight::new(actuator, EventStore::new(&self.events_file))
            .with_upcoming_threshold(self.upcoming_threshold()))
    }
}
