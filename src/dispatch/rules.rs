//! Routing table
//!
//! Rules are tried in order and the first whose topic matches and whose
//! keyword is contained in the payload wins. Matching is substring
//! containment and case-sensitive, so `"turn on now"` is an `on` command and
//! a payload containing both keywords resolves to the earlier rule.

use crate::mqtt::InboundTopic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RelayOn,
    RelayOff,
    Uptime,
    Reboot,
    GetIp,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    topic: InboundTopic,
    keyword: &'static str,
    command: Command,
}

const RULES: [Rule; 5] = [
    Rule {
        topic: InboundTopic::Switch,
        keyword: "on",
        command: Command::RelayOn,
    },
    Rule {
        topic: InboundTopic::Switch,
        keyword: "off",
        command: Command::RelayOff,
    },
    Rule {
        topic: InboundTopic::System,
        keyword: "uptime",
        command: Command::Uptime,
    },
    Rule {
        topic: InboundTopic::System,
        keyword: "reboot",
        command: Command::Reboot,
    },
    Rule {
        topic: InboundTopic::System,
        keyword: "getip",
        command: Command::GetIp,
    },
];

pub fn resolve(topic: InboundTopic, payload: &str) -> Option<Command> {
    RULES
        .iter()
        .find(|rule| rule.topic == topic && payload.contains(rule.keyword))
        .map(|rule| rule.command)
}
