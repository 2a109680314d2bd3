// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service configuration.
//!
//! [`AppConfig`] is read from a TOML file and then adjusted from the
//! environment. Every section has defaults matching the devices of the
//! reference installation, so an empty or missing file yields a working
//! configuration.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [transport]
//! timeout_ms = 10000
//!
//! [discovery]
//! bootstrap = "192.168.1.184"
//! device = "Device 1"
//!
//! [[devices]]
//! name = "Device 2"
//! address = "192.168.1.23"
//!
//! [poller]
//! address = "192.168.1.217"
//! interval_ms = 1000
//! history_capacity = 3600
//!
//! [board]
//! address = "192.168.1.195"
//! relays = ["relay1", "relay2", "relay3", "relay4"]
//!
//! [store]
//! backend = "mqtt"
//! broker = "mqtt://localhost:1883"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ValueError;
use crate::telemetry::DEFAULT_HISTORY_CAPACITY;
use crate::types::{DeviceAddress, RelayId};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "ESPDECK_CONFIG";

/// File read when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "espdeck.toml";

/// Environment variable holding the motor device address.
pub const MOTOR_ADDRESS_VAR: &str = "ESPDECK_MOTOR_ADDRESS";

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AppConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file that was parsed.
        path: PathBuf,
        /// The TOML failure.
        source: toml::de::Error,
    },
}

/// Root configuration of the `espdeck` service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Device request settings.
    pub transport: TransportConfig,
    /// Address discovery through a bootstrap device.
    pub discovery: DiscoveryConfig,
    /// Devices with a fixed address.
    pub devices: Vec<DeviceEntry>,
    /// Sensor polling.
    pub poller: PollerConfig,
    /// Relay board.
    pub board: BoardConfig,
    /// Motor controller.
    pub motor: MotorConfig,
    /// Shared relay state store.
    pub store: StoreConfig,
}

impl AppConfig {
    /// Loads the file named by `ESPDECK_CONFIG` (or `espdeck.toml`) and
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads a configuration file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(MOTOR_ADDRESS_VAR).filter(|a| !a.trim().is_empty()) {
            self.motor.address = Some(address);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            transport: TransportConfig::default(),
            discovery: DiscoveryConfig::default(),
            devices: default_devices(),
            poller: PollerConfig::default(),
            board: BoardConfig::default(),
            motor: MotorConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Device request settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
}

impl TransportConfig {
    /// The request deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Address discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Device answering `GET /ip` with the address of the discovered device.
    pub bootstrap: String,
    /// Name under which the discovered device is registered.
    pub device: String,
}

impl DiscoveryConfig {
    /// The validated bootstrap address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is malformed.
    pub fn bootstrap_address(&self) -> Result<DeviceAddress, ValueError> {
        DeviceAddress::new(&self.bootstrap)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bootstrap: "192.168.1.184".to_string(),
            device: "Device 1".to_string(),
        }
    }
}

/// A named device with a fixed address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceEntry {
    /// Display name.
    pub name: String,
    /// Host or `host:port`.
    pub address: String,
}

impl DeviceEntry {
    fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
        }
    }

    /// The validated address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is malformed.
    pub fn device_address(&self) -> Result<DeviceAddress, ValueError> {
        DeviceAddress::new(&self.address)
    }
}

/// The fixed devices of the relay panel.
#[must_use]
pub fn default_devices() -> Vec<DeviceEntry> {
    vec![
        DeviceEntry::new("Device 2", "192.168.1.23"),
        DeviceEntry::new("Device 3", "192.168.1.61"),
        DeviceEntry::new("Device 4", "192.168.1.23"),
    ]
}

/// Sensor polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Address of the sensor device.
    pub address: String,
    /// Milliseconds between ticks.
    pub interval_ms: u64,
    /// Ticks kept in the history.
    pub history_capacity: usize,
}

impl PollerConfig {
    /// The validated sensor device address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is malformed.
    pub fn device_address(&self) -> Result<DeviceAddress, ValueError> {
        DeviceAddress::new(&self.address)
    }

    /// Time between ticks.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.217".to_string(),
            interval_ms: 1000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Relay board settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Address of the relay board.
    pub address: String,
    /// Relays exposed by the board.
    pub relays: Vec<String>,
}

impl BoardConfig {
    /// The validated board address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is malformed.
    pub fn device_address(&self) -> Result<DeviceAddress, ValueError> {
        DeviceAddress::new(&self.address)
    }

    /// The validated relay identifiers.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRelayId` for the first malformed name.
    pub fn relay_ids(&self) -> Result<Vec<RelayId>, ValueError> {
        self.relays.iter().map(RelayId::new).collect()
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.195".to_string(),
            relays: (1..=4).map(|n| format!("relay{n}")).collect(),
        }
    }
}

/// Motor controller settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Address of the motor device; `None` leaves the motor unresolved.
    pub address: Option<String>,
}

impl MotorConfig {
    /// The validated motor address, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is malformed.
    pub fn device_address(&self) -> Result<Option<DeviceAddress>, ValueError> {
        self.address.as_deref().map(DeviceAddress::new).transpose()
    }
}

/// Relay state store backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store.
    #[default]
    Memory,
    /// Retained messages on an MQTT broker.
    Mqtt {
        /// Broker URL, e.g. `mqtt://localhost:1883`.
        broker: String,
        /// Optional user name.
        #[serde(default)]
        username: Option<String>,
        /// Optional password.
        #[serde(default)]
        password: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.transport.timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery.bootstrap, "192.168.1.184");
        assert_eq!(config.discovery.device, "Device 1");
        assert_eq!(config.poller.address, "192.168.1.217");
        assert_eq!(config.poller.interval(), Duration::from_secs(1));
        assert_eq!(config.poller.history_capacity, 3600);
        assert_eq!(config.board.address, "192.168.1.195");
        assert_eq!(config.board.relays, ["relay1", "relay2", "relay3", "relay4"]);
        assert_eq!(config.motor.address, None);
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn default_devices_match_panel() {
        let config = AppConfig::default();
        let names: Vec<_> = config.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Device 2", "Device 3", "Device 4"]);
        assert_eq!(config.devices[1].address, "192.168.1.61");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [poller]
            interval_ms = 250

            [[devices]]
            name = "Porch"
            address = "10.0.0.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.interval(), Duration::from_millis(250));
        assert_eq!(config.poller.address, "192.168.1.217");
        assert_eq!(config.devices, vec![DeviceEntry::new("Porch", "10.0.0.5")]);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn mqtt_store_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            backend = "mqtt"
            broker = "mqtt://broker.local:1883"
            username = "deck"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Mqtt {
                broker: "mqtt://broker.local:1883".to_string(),
                username: Some("deck".to_string()),
                password: Some("secret".to_string()),
            }
        );
    }

    #[test]
    fn motor_address_from_environment() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == MOTOR_ADDRESS_VAR).then(|| "192.168.1.77".to_string()));

        let address = config.motor.device_address().unwrap().unwrap();
        assert_eq!(address.as_str(), "192.168.1.77");
    }

    #[test]
    fn blank_motor_variable_is_ignored() {
        let mut config = AppConfig::default();
        config.motor.address = Some("192.168.1.10".to_string());
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.motor.address.as_deref(), Some("192.168.1.10"));
    }

    #[test]
    fn typed_accessors_validate() {
        let mut config = AppConfig::default();
        assert_eq!(config.board.relay_ids().unwrap().len(), 4);

        config.board.relays.push("bad id".to_string());
        assert!(config.board.relay_ids().is_err());

        config.discovery.bootstrap = " ".to_string();
        assert!(config.discovery.bootstrap_address().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::from_file("/nonexistent/espdeck.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[store]\nbackend = \"redis\"\n");
        assert!(result.is_err());
    }
}
