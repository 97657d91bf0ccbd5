use crate::config::{DeviceConfig, RelayBackend, TimingConfig};
use crate::device::{
    GpioRelay, ProcessUptime, RelayActuator, Restarter, SimulatedRelay, SystemRestarter,
    UptimeProvider,
};
use crate::link::{LinkMonitor, NmcliRadio, WifiRadio};
use crate::mqtt::Topics;
use color_eyre::eyre::{eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Delays used outside the link monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTiming {
    pub report_interval: Duration,
    pub reboot_grace: Duration,
    pub session_loss_delay: Duration,
    pub link_watchdog: Duration,
}

impl From<&TimingConfig> for CoreTiming {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            report_interval: Duration::from_secs(timing.report_interval_secs),
            reboot_grace: Duration::from_millis(timing.reboot_grace_ms),
            session_loss_delay: Duration::from_millis(timing.session_loss_delay_ms),
            link_watchdog: Duration::from_secs(timing.link_watchdog_secs),
        }
    }
}

/// Long-lived collaborators, built once at startup and handed to each
/// component. Cloning only clones the `Arc`s.
#[derive(Clone)]
pub struct DeviceContext {
    pub topics: Topics,
    pub relay: Arc<dyn RelayActuator>,
    pub uptime: Arc<dyn UptimeProvider>,
    pub restarter: Arc<dyn Restarter>,
    pub link: Arc<LinkMonitor>,
    pub timing: CoreTiming,
}

impl DeviceContext {
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        let relay: Arc<dyn RelayActuator> = match config.relay.backend {
            RelayBackend::Gpio => Arc::new(
                GpioRelay::open(config.relay.pin)
                    .map_err(|e| eyre!("Failed to open relay on GPIO {}: {}", config.relay.pin, e))?,
            ),
            RelayBackend::Simulated => {
                info!("Using simulated relay");
                Arc::new(SimulatedRelay::default())
            }
        };

        let radio: Arc<dyn WifiRadio> = Arc::new(NmcliRadio::new(config.wifi.interface.clone()));
        let link = Arc::new(LinkMonitor::new(
            radio,
            config.wifi.credentials(),
            config.timing.link_timing(),
        ));

        Ok(Self {
            topics: Topics::new(&config.device.name),
            relay,
            uptime: Arc::new(ProcessUptime::new()),
            restarter: Arc::new(SystemRestarter::new(config.restart.mode)),
            link,
            timing: CoreTiming::from(&config.timing),
        })
    }
}
