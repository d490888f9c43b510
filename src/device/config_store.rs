//! Key-value store holding the cached device identity.

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const IP_KEY: &str = "ip";
pub const ALIAS_KEY: &str = "alias";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("Failed to serialize {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
}

pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Cached address and expected alias of the bulb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub ip: Option<String>,
    pub alias: Option<String>,
}

impl DeviceIdentity {
    pub fn load<S: ConfigStore + ?Sized>(store: &S) -> Self {
        DeviceIdentity {
            ip: store.get(IP_KEY).filter(|v| !v.is_empty()),
            alias: store.get(ALIAS_KEY).filter(|v| !v.is_empty()),
        }
    }
}

/// JSON object on disk. A missing or corrupt file reads as empty; unknown
/// keys survive writes.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Map<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("Config file {:?} is not a JSON object, treating it as empty", self.path);
                Map::new()
            }
        }
    }
}

impl ConfigStore for JsonConfigFile {
    fn get(&self, key: &str) -> Option<String> {
        match self.read().get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut config = self.read();
        config.insert(key.to_string(), Value::String(value.to_string()));
        let content = serde_json::to_string_pretty(&Value::Object(config))
            .map_err(|e| StoreError::Serialize(self.path.clone(), e))?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::Io(self.path.clone(), e))
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfig {
    values: DashMap<String, String>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(ip: Option<&str>, alias: Option<&str>) -> Self {
        let config = Self::new();
        if let Some(ip) = ip {
            config.values.insert(IP_KEY.to_string(), ip.to_string());
        }
        if let Some(alias) = alias {
            config.values.insert(ALIAS_KEY.to_string(), alias.to_string());
        }
        config
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
