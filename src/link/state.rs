use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Address reported by the link monitor while no address is held.
pub const NULL_ADDRESS: &str = "0.0.0.0";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting {
        attempt: u32,
    },
    Connected {
        ip: Ipv4Addr,
    },
}

impl LinkState {
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            LinkState::Connected { ip } => Some(*ip),
            _ => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting { attempt } => write!(f, "connecting (attempt {})", attempt),
            LinkState::Connected { ip } => write!(f, "connected ({})", ip),
        }
    }
}

/// Notifications raised by the link monitor.
///
/// The first connection after start is not an event; only a connection that
/// follows a detected loss is reported as `Restored`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Lost,
    Restored,
}

/// Timing table for the two-level reconnect loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTiming {
    /// Address checks per association attempt
    pub poll_checks: u32,
    /// Delay between two address checks
    pub poll_interval: Duration,
    /// Wait after an attempt that never produced an address
    pub retry_backoff: Duration,
    /// Pause after success before the connection is reported
    pub settle_delay: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            poll_checks: 10,
            poll_interval: Duration::from_millis(200),
            retry_backoff: Duration::from_secs(10),
            settle_delay: Duration::from_millis(200),
        }
    }
}

/// Parses the address reported by the radio driver.
///
/// Empty strings, the all-zero sentinel and anything that is not an IPv4
/// address count as "no address". A `/prefix` suffix is accepted.
pub fn parse_link_address(raw: &str) -> Option<Ipv4Addr> {
    let address = raw.trim().split('/').next().unwrap_or_default();
    if address.is_empty() || address == NULL_ADDRESS {
        return None;
    }

    address
        .parse::<Ipv4Addr>()
        .ok()
        .filter(|ip| !ip.is_unspecified())
}
