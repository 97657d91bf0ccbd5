//! # Device configuration
//!
//! One TOML file describes the device: its name (which fixes the topic
//! namespace), Wi-Fi credentials, broker identity, relay wiring, the timing
//! table of every loop and the restart mode. Missing sections and fields fall
//! back to defaults. A missing file is created with the defaults so the
//! operator has something to edit, and startup stops until an SSID is set.
//!
//! ```toml
//! [device]
//! name = "nf2"
//!
//! [wifi]
//! ssid = "workshop"
//! password = "secret"
//! interface = "wlan0"
//!
//! [broker]
//! host = "192.168.1.10"
//! client_id = "nf2"
//!
//! [relay]
//! backend = "gpio"
//! pin = 25
//! ```

use crate::device::RestartMode;
use crate::link::{LinkTiming, WifiCredentials};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_DIR: &str = "homelink";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub device: DeviceSection,
    pub wifi: WifiConfig,
    pub broker: BrokerConfig,
    pub relay: RelayConfig,
    pub timing: TimingConfig,
    pub restart: RestartConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceSection {
    /// Second segment of every topic: `home/<name>/…`
    pub name: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: "nf2".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    pub interface: String,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            interface: "wlan0".to_string(),
        }
    }
}

impl WifiConfig {
    pub fn credentials(&self) -> WifiCredentials {
        WifiCredentials {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Credentials are only sent when the username is non-empty
    pub username: String,
    pub password: String,
    pub keep_alive_secs: u64,
    /// Outgoing request queue of the client
    pub request_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "nf2".to_string(),
            username: String::new(),
            password: String::new(),
            keep_alive_secs: 30,
            request_capacity: 10,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelayBackend {
    #[default]
    Gpio,
    Simulated,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub backend: RelayBackend,
    /// BCM pin number
    pub pin: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend: RelayBackend::Gpio,
            pin: 25,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub link_poll_checks: u32,
    pub link_poll_interval_ms: u64,
    pub link_retry_backoff_ms: u64,
    pub link_settle_ms: u64,
    pub link_watchdog_secs: u64,
    pub report_interval_secs: u64,
    pub reboot_grace_ms: u64,
    pub session_loss_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            link_poll_checks: 10,
            link_poll_interval_ms: 200,
            link_retry_backoff_ms: 10_000,
            link_settle_ms: 200,
            link_watchdog_secs: 30,
            report_interval_secs: 10,
            reboot_grace_ms: 2_000,
            session_loss_delay_ms: 5_000,
        }
    }
}

impl TimingConfig {
    pub fn link_timing(&self) -> LinkTiming {
        LinkTiming {
            poll_checks: self.link_poll_checks,
            poll_interval: Duration::from_millis(self.link_poll_interval_ms),
            retry_backoff: Duration::from_millis(self.link_retry_backoff_ms),
            settle_delay: Duration::from_millis(self.link_settle_ms),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RestartConfig {
    pub mode: RestartMode,
}

impl DeviceConfig {
    /// `<config_dir>/homelink/config.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using ~/.config");
            let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.push(".config");
            home
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads and validates the file at `path`. A missing file is written with
    /// the defaults first; those fail validation until the SSID is filled in.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?;

        if !exists {
            warn!(
                "Config file {} does not exist, writing defaults",
                path.display()
            );
            let config = Self::default();
            config.save(path).await?;
            config
                .validate()
                .map_err(|e| eyre!("Edit the new config file {}: {}", path.display(), e))?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.device.name;
        if name.is_empty() {
            return Err(eyre!("device.name must not be empty"));
        }
        if name.contains(|c: char| matches!(c, '/' | '#' | '+')) {
            return Err(eyre!(
                "device.name '{}' must not contain '/', '#' or '+'",
                name
            ));
        }
        if self.wifi.ssid.is_empty() {
            return Err(eyre!("wifi.ssid must not be empty"));
        }
        if self.broker.client_id.is_empty() {
            return Err(eyre!("broker.client_id must not be empty"));
        }
        if self.broker.port == 0 {
            return Err(eyre!("broker.port must not be 0"));
        }
        if self.broker.request_capacity == 0 {
            return Err(eyre!("broker.request_capacity must be at least 1"));
        }
        if self.timing.link_poll_checks == 0 {
            return Err(eyre!("timing.link_poll_checks must be at least 1"));
        }
        if self.timing.report_interval_secs == 0 || self.timing.link_watchdog_secs == 0 {
            return Err(eyre!("timing intervals must be greater than 0"));
        }
        Ok(())
    }
}
