use super::radio::{AssociationStatus, WifiCredentials, WifiRadio};
use super::state::{parse_link_address, ConnectionEvent, LinkState, LinkTiming, NULL_ADDRESS};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Read-only view of the current address, used by the `getip` command.
///
/// Implementations may block on the radio driver; callers in async context
/// go through `spawn_blocking`.
pub trait IpSource: Send + Sync {
    /// Current IPv4 address as text, `0.0.0.0` while none is held.
    fn ip_address(&self) -> String;
}

pub struct LinkMonitor {
    radio: Arc<dyn WifiRadio>,
    credentials: WifiCredentials,
    timing: LinkTiming,
    state: watch::Sender<LinkState>,
    events: broadcast::Sender<ConnectionEvent>,
    // Set by the first successful connection; later ones are "restored"
    has_connected: AtomicBool,
}

impl LinkMonitor {
    pub fn new(radio: Arc<dyn WifiRadio>, credentials: WifiCredentials, timing: LinkTiming) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            radio,
            credentials,
            timing,
            state,
            events,
            has_connected: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Queries the radio on the blocking pool; `Some` only for a usable,
    /// non-sentinel IPv4 address.
    pub async fn is_connected(&self) -> Option<Ipv4Addr> {
        let radio = Arc::clone(&self.radio);

        match tokio::task::spawn_blocking(move || radio.ipv4_address()).await {
            Ok(raw) => parse_link_address(&raw),
            Err(e) => {
                error!("Address query task failed: {}", e);
                None
            }
        }
    }

    /// Returns once the link holds a valid address. Retries forever.
    pub async fn connect(&self) -> Ipv4Addr {
        if let Some(ip) = self.is_connected().await {
            let already_reported = self.state.borrow().ip().is_some();
            if already_reported {
                return ip;
            }
            return self.mark_connected(ip).await;
        }

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            self.state.send_replace(LinkState::Connecting { attempt });
            info!(
                "Connecting to Wi-Fi network {}... [Attempt {}]",
                self.credentials.ssid, attempt
            );

            let status = self.associate().await;

            for check in 0..self.timing.poll_checks {
                if status.is_success() {
                    if let Some(ip) = self.is_connected().await {
                        return self.mark_connected(ip).await;
                    }
                    debug!("Associated, waiting for address (check {})", check + 1);
                }
                sleep(self.timing.poll_interval).await;
            }

            if status.is_success() {
                error!("Connection failed [associated but no IPv4 address assigned]");
            } else {
                error!("Connection failed [{}]", status);
            }
            sleep(self.timing.retry_backoff).await;

            if let Some(ip) = self.is_connected().await {
                return self.mark_connected(ip).await;
            }
        }
    }

    /// Raises [`ConnectionEvent::Lost`] and reconnects if the address is gone.
    pub async fn check_connection(&self) {
        if self.is_connected().await.is_some() {
            return;
        }

        self.state.send_replace(LinkState::Disconnected);
        let _ = self.events.send(ConnectionEvent::Lost);
        warn!("Lost network connection. Attempting to reconnect...");

        self.connect().await;
    }

    async fn associate(&self) -> AssociationStatus {
        let radio = Arc::clone(&self.radio);
        let credentials = self.credentials.clone();

        match tokio::task::spawn_blocking(move || radio.associate(&credentials)).await {
            Ok(status) => status,
            Err(e) => {
                error!("Association task failed: {}", e);
                AssociationStatus::UnspecifiedFailure
            }
        }
    }

    async fn mark_connected(&self, ip: Ipv4Addr) -> Ipv4Addr {
        sleep(self.timing.settle_delay).await;
        self.state.send_replace(LinkState::Connected { ip });

        if self.has_connected.swap(true, Ordering::SeqCst) {
            info!(
                "Connection restored to Wi-Fi network {} with IP address {}",
                self.credentials.ssid, ip
            );
            let _ = self.events.send(ConnectionEvent::Restored);
        } else {
            info!(
                "Connected to Wi-Fi network {} with IP address {}",
                self.credentials.ssid, ip
            );
        }

        ip
    }
}

impl IpSource for LinkMonitor {
    fn ip_address(&self) -> String {
        parse_link_address(&self.radio.ipv4_address())
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| NULL_ADDRESS.to_string())
    }
}

/// Periodically runs [`LinkMonitor::check_connection`].
pub fn spawn_watchdog(monitor: Arc<LinkMonitor>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            monitor.check_connection().await;
        }
    })
}
