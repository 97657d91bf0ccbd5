//! Topic namespace of one device
//!
//! Every topic is `home/<device-name>/<suffix>`. Inbound topics are matched
//! by exact string equality, never as patterns.

pub const WILDCARD: &str = "#";

/// Inbound topics the dispatcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic {
    Switch,
    System,
    Errors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub switch: String,
    pub switch_relay: String,
    pub system: String,
    pub system_ip: String,
    pub uptime: String,
    pub maintenance: String,
    pub errors: String,
    pub start: String,
}

impl Topics {
    pub fn new(device_name: &str) -> Self {
        let root = format!("home/{}", device_name);
        let topic = |suffix: &str| format!("{}/{}", root, suffix);

        Self {
            switch: topic("switch"),
            switch_relay: topic("switch/relay"),
            system: topic("system"),
            system_ip: topic("system/ip"),
            uptime: topic("uptime"),
            maintenance: topic("maintenance"),
            errors: topic("errors"),
            start: topic("start"),
        }
    }

    pub fn classify(&self, topic: &str) -> Option<InboundTopic> {
        if topic == self.switch {
            Some(InboundTopic::Switch)
        } else if topic == self.system {
            Some(InboundTopic::System)
        } else if topic == self.errors {
            Some(InboundTopic::Errors)
        } else {
            None
        }
    }
}
