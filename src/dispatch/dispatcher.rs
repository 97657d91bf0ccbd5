use super::rules::{resolve, Command};
use super::DispatchError;
use crate::device::{RelayActuator, RestartReason, Restarter, UptimeProvider};
use crate::link::IpSource;
use crate::mqtt::{InboundTopic, MqttMessage, Publisher, Topics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct CommandDispatcher {
    topics: Topics,
    publisher: Arc<dyn Publisher>,
    relay: Arc<dyn RelayActuator>,
    uptime: Arc<dyn UptimeProvider>,
    ip_source: Arc<dyn IpSource>,
    restarter: Arc<dyn Restarter>,
    reboot_grace: Duration,
}

impl CommandDispatcher {
    pub fn new(
        topics: Topics,
        publisher: Arc<dyn Publisher>,
        relay: Arc<dyn RelayActuator>,
        uptime: Arc<dyn UptimeProvider>,
        ip_source: Arc<dyn IpSource>,
        restarter: Arc<dyn Restarter>,
        reboot_grace: Duration,
    ) -> Self {
        Self {
            topics,
            publisher,
            relay,
            uptime,
            ip_source,
            restarter,
            reboot_grace,
        }
    }

    /// Serves inbound messages one at a time until the channel closes.
    pub async fn run(self, mut inbound: mpsc::Receiver<MqttMessage>) {
        info!("Command dispatcher started");

        while let Some(message) = inbound.recv().await {
            if let Err(e) = self.dispatch(&message).await {
                error!("Failed to handle {}: {}", message, e);
            }
        }

        warn!("Inbound channel closed, command dispatcher stopped");
    }

    /// Applies at most one command for `message`: action, then reply, then log.
    pub async fn dispatch(&self, message: &MqttMessage) -> Result<Option<Command>, DispatchError> {
        let Some(topic) = self.topics.classify(&message.topic) else {
            return Ok(None);
        };

        if topic == InboundTopic::Errors {
            debug!("Error report received: {}", message);
            return Ok(None);
        }

        let Some(command) = resolve(topic, &message.payload) else {
            return Ok(None);
        };

        match command {
            Command::RelayOn => {
                self.relay.turn_on()?;
                self.reply(&self.topics.switch_relay, "ON");
                info!("Relay turned ON and message published");
            }
            Command::RelayOff => {
                self.relay.turn_off()?;
                self.reply(&self.topics.switch_relay, "OFF");
                info!("Relay turned OFF and message published");
            }
            Command::Uptime => {
                let uptime = self.uptime.uptime();
                self.reply(&self.topics.uptime, &uptime);
                info!("Uptime requested, published: {}", uptime);
            }
            Command::GetIp => {
                let ip_source = Arc::clone(&self.ip_source);
                let ip = tokio::task::spawn_blocking(move || ip_source.ip_address()).await?;
                self.reply(&self.topics.system_ip, &ip);
                info!("IP address requested, published: {}", ip);
            }
            Command::Reboot => {
                let notice = format!(
                    "Manual reboot at: {}",
                    chrono::Utc::now().format("%H:%M:%S")
                );
                self.reply(&self.topics.maintenance, &notice);
                warn!("Rebooting system in {:?}...", self.reboot_grace);
                tokio::time::sleep(self.reboot_grace).await;
                self.restarter.restart_process(RestartReason::RebootCommand);
            }
        }

        Ok(Some(command))
    }

    fn reply(&self, topic: &str, payload: &str) {
        if let Err(e) = self.publisher.publish_text(topic, payload) {
            warn!("Failed to publish to {}: {}", topic, e);
        }
    }
}
