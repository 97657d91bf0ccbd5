//! In-memory doubles shared by the unit tests.

use crate::context::{CoreTiming, DeviceContext};
use crate::device::{RestartReason, Restarter, SimulatedRelay, UptimeProvider};
use crate::link::radio::AssociationStatus;
use crate::link::{IpSource, LinkMonitor, LinkTiming, WifiCredentials, WifiRadio};
use crate::mqtt::error::SessionError;
use crate::mqtt::{Publisher, Topics};
use rumqttc::{ClientError, QoS, Request};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Radio that replays a script of association results.
///
/// Each entry may also change the reported address, whether or not the
/// association succeeded. An exhausted script fails every attempt.
pub struct ScriptedRadio {
    address: Mutex<String>,
    script: Mutex<VecDeque<(AssociationStatus, Option<String>)>>,
    associations: AtomicUsize,
}

impl ScriptedRadio {
    pub fn new(address: &str) -> Self {
        Self {
            address: Mutex::new(address.to_string()),
            script: Mutex::new(VecDeque::new()),
            associations: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, status: AssociationStatus, address: Option<&str>) {
        self.script
            .lock()
            .unwrap()
            .push_back((status, address.map(str::to_string)));
    }

    pub fn set_address(&self, address: &str) {
        *self.address.lock().unwrap() = address.to_string();
    }

    pub fn associations(&self) -> usize {
        self.associations.load(Ordering::SeqCst)
    }
}

impl WifiRadio for ScriptedRadio {
    fn associate(&self, _credentials: &WifiCredentials) -> AssociationStatus {
        self.associations.fetch_add(1, Ordering::SeqCst);

        match self.script.lock().unwrap().pop_front() {
            Some((status, address)) => {
                if let Some(address) = address {
                    self.set_address(&address);
                }
                status
            }
            None => AssociationStatus::UnspecifiedFailure,
        }
    }

    fn ipv4_address(&self) -> String {
        self.address.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Published>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    /// Every later publish fails as if the request queue were full.
    pub fn fail_publishes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.published()
            .into_iter()
            .map(|p| (p.topic, String::from_utf8_lossy(&p.payload).into_owned()))
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), SessionError> {
        if self.failing.load(Ordering::SeqCst) {
            let request = Request::Publish(rumqttc::Publish::new(topic, qos, payload.to_vec()));
            return Err(ClientError::TryRequest(request).into());
        }

        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRestarter {
    reasons: Mutex<Vec<RestartReason>>,
}

impl RecordingRestarter {
    pub fn reasons(&self) -> Vec<RestartReason> {
        self.reasons.lock().unwrap().clone()
    }
}

impl Restarter for RecordingRestarter {
    fn restart_process(&self, reason: RestartReason) {
        self.reasons.lock().unwrap().push(reason);
    }
}

pub struct FixedUptime(pub String);

impl UptimeProvider for FixedUptime {
    fn uptime(&self) -> String {
        self.0.clone()
    }
}

pub struct StaticIp(pub String);

impl IpSource for StaticIp {
    fn ip_address(&self) -> String {
        self.0.clone()
    }
}

/// Handles to the doubles inside a [`test_context`].
pub struct TestHandles {
    pub relay: Arc<SimulatedRelay>,
    pub restarter: Arc<RecordingRestarter>,
}

/// Context for device `nf2` with in-memory collaborators and millisecond timings.
pub fn test_context() -> (DeviceContext, TestHandles) {
    let relay = Arc::new(SimulatedRelay::default());
    let restarter = Arc::new(RecordingRestarter::default());
    let radio = Arc::new(ScriptedRadio::new("10.0.0.1"));

    let link = LinkMonitor::new(
        radio,
        WifiCredentials {
            ssid: "workshop".to_string(),
            password: "secret".to_string(),
        },
        LinkTiming {
            poll_checks: 3,
            poll_interval: Duration::from_millis(1),
            retry_backoff: Duration::from_millis(2),
            settle_delay: Duration::ZERO,
        },
    );

    let context = DeviceContext {
        topics: Topics::new("nf2"),
        relay: relay.clone(),
        uptime: Arc::new(FixedUptime("0 days, 00:00:01".to_string())),
        restarter: restarter.clone(),
        link: Arc::new(link),
        timing: CoreTiming {
            report_interval: Duration::from_millis(10),
            reboot_grace: Duration::from_millis(1),
            session_loss_delay: Duration::from_millis(1),
            link_watchdog: Duration::from_millis(10),
        },
    };

    (
        context,
        TestHandles { relay, restarter },
    )
}
