//! Session Manager
//!
//! Owns the single broker connection. The lifecycle is a two-state typestate
//! machine:
//!
//! ```text
//! SessionManager<Configured> ──start()──► SessionManager<Running> ──run()──► restart
//!        │                                       │
//!   connect + subscribe "#"               poll event loop, forward inbound
//!   spawn dispatcher + reporter           publishes to the dispatcher task
//! ```
//!
//! A failed initial connect is returned to the caller. Once running, any
//! connection loss ends in a full restart through the injected [`Restarter`];
//! the session is never rebuilt in place.

use super::config::mqtt_options;
use super::error::SessionError;
use super::message_manager::MqttMessage;
use super::publisher::Publisher;
use super::topics::WILDCARD;
use crate::config::BrokerConfig;
use crate::context::DeviceContext;
use crate::device::{RestartReason, Restarter};
use crate::dispatch::CommandDispatcher;
use crate::link::IpSource;
use crate::reporter::BackgroundReporter;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Packet, QoS};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

const INBOUND_CAPACITY: usize = 32;

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Configured, // Options built, nothing on the wire yet
    Running,    // Connected, subscribed, dispatcher and reporter spawned
}

#[machine]
pub struct SessionManager<S: SessionState> {
    client: AsyncClient,
    eventloop: EventLoop,
    context: DeviceContext,
    inbound: Option<mpsc::Sender<MqttMessage>>,
}

impl SessionManager<Configured> {
    pub fn create(broker: &BrokerConfig, context: DeviceContext) -> Self {
        info!(
            "Configuring MQTT session {} -> {}:{}",
            broker.client_id, broker.host, broker.port
        );
        let (client, eventloop) = AsyncClient::new(mqtt_options(broker), broker.request_capacity);

        Self::new(client, eventloop, context, None)
    }

    /// Connects, subscribes to everything and wires up the dispatcher and
    /// the background reporter. Connect failures are not retried.
    pub async fn start(mut self) -> Result<SessionManager<Running>, SessionError> {
        match wait_for_connack(&mut self.eventloop).await {
            Ok(()) => info!("MQTT client connected"),
            Err(e) => {
                error!("MQTT connection failed: {}", e);
                return Err(e);
            }
        }

        self.client.subscribe(WILDCARD, QoS::AtLeastOnce).await?;
        info!("Subscribed to {}", WILDCARD);

        let publisher: Arc<dyn Publisher> = Arc::new(self.client.clone());
        let ip_source: Arc<dyn IpSource> = self.context.link.clone();

        let dispatcher = CommandDispatcher::new(
            self.context.topics.clone(),
            publisher.clone(),
            self.context.relay.clone(),
            self.context.uptime.clone(),
            ip_source,
            self.context.restarter.clone(),
            self.context.timing.reboot_grace,
        );
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        tokio::spawn(dispatcher.run(inbound_rx));
        self.inbound = Some(inbound_tx);
        debug!("Command dispatcher registered as message sink");

        let _reporter = BackgroundReporter::new(
            publisher,
            self.context.uptime.clone(),
            self.context.topics.clone(),
            self.context.timing.report_interval,
        )
        .spawn();

        Ok(self.transition())
    }
}

impl SessionManager<Running> {
    /// Drives the broker event loop until the session is lost, then restarts.
    ///
    /// Returns the loss reason only if the restarter returns (tests).
    pub async fn run(mut self) -> String {
        info!("MQTT session running");

        loop {
            let event = self.eventloop.poll().await;
            match classify_event(event) {
                SessionEvent::Inbound(message) => self.forward(message),
                SessionEvent::Closed(reason) => {
                    restart_after_loss(
                        self.context.restarter.as_ref(),
                        self.context.timing.session_loss_delay,
                        &reason,
                    )
                    .await;
                    return reason;
                }
                SessionEvent::Other => {}
            }
        }
    }

    fn forward(&self, message: MqttMessage) {
        let Some(inbound) = &self.inbound else {
            return;
        };

        match inbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!("Dispatcher busy, dropping message {}", message)
            }
            Err(TrySendError::Closed(message)) => {
                error!("Dispatcher stopped, dropping message {}", message)
            }
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), SessionError> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(_)) => return Ok(()),
            other => debug!("Event before ConnAck: {:?}", other),
        }
    }
}

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Inbound(MqttMessage),
    Closed(String),
    Other,
}

pub(crate) fn classify_event(event: Result<Event, ConnectionError>) -> SessionEvent {
    match event {
        Ok(Event::Incoming(Packet::Publish(publish))) => {
            SessionEvent::Inbound(MqttMessage::from_publish(&publish))
        }
        Ok(Event::Incoming(Packet::Disconnect)) => {
            SessionEvent::Closed("broker sent disconnect".to_string())
        }
        Ok(_) => SessionEvent::Other,
        Err(e) => SessionEvent::Closed(e.to_string()),
    }
}

pub(crate) async fn restart_after_loss(restarter: &dyn Restarter, delay: Duration, reason: &str) {
    error!("Lost connection to broker: {}", reason);
    warn!("Restarting the device in {:?}", delay);
    tokio::time::sleep(delay).await;
    restarter.restart_process(RestartReason::SessionLost);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RelayActuator;
    use crate::testing::{test_context, RecordingRestarter};
    use rumqttc::{Outgoing, Publish};
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
    // length-prefixed "#" topic filter inside a SUBSCRIBE payload
    const WILDCARD_FILTER: [u8; 3] = [0x00, 0x01, b'#'];

    fn qos0_publish(topic: &str, payload: &str) -> Vec<u8> {
        let remaining = 2 + topic.len() + payload.len();
        let mut packet = vec![0x30, remaining as u8, 0x00, topic.len() as u8];
        packet.extend_from_slice(topic.as_bytes());
        packet.extend_from_slice(payload.as_bytes());
        packet
    }

    /// Accepts one client, acknowledges it, waits for the wildcard
    /// subscription, sends `on` to the switch topic and hangs up.
    /// Returns whether a SUBSCRIBE for `#` was seen.
    async fn one_shot_broker(listener: TcpListener) -> bool {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];

        let n = socket.read(&mut buf).await.unwrap();
        assert_eq!(buf[0] >> 4, 1, "expected CONNECT, got {:?}", &buf[..n]);
        socket.write_all(&CONNACK_ACCEPTED).await.unwrap();

        let mut received = Vec::new();
        while !received.windows(3).any(|w| w == WILDCARD_FILTER) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return false;
            }
            received.extend_from_slice(&buf[..n]);
        }

        socket
            .write_all(&qos0_publish("home/nf2/switch", "on"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        received.contains(&0x82)
    }

    #[test]
    fn inbound_publish_is_forwarded() {
        let publish = Publish::new("home/nf2/switch", QoS::AtLeastOnce, "on");

        match classify_event(Ok(Event::Incoming(Packet::Publish(publish)))) {
            SessionEvent::Inbound(message) => {
                assert_eq!(message.topic, "home/nf2/switch");
                assert_eq!(message.payload, "on");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn disconnect_and_transport_errors_close_the_session() {
        assert!(matches!(
            classify_event(Ok(Event::Incoming(Packet::Disconnect))),
            SessionEvent::Closed(_)
        ));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(
            classify_event(Err(ConnectionError::Io(reset))),
            SessionEvent::Closed(_)
        ));
    }

    #[test]
    fn keep_alive_traffic_is_ignored() {
        assert!(matches!(
            classify_event(Ok(Event::Incoming(Packet::PingResp))),
            SessionEvent::Other
        ));
        assert!(matches!(
            classify_event(Ok(Event::Outgoing(Outgoing::PingReq))),
            SessionEvent::Other
        ));
    }

    #[tokio::test]
    async fn session_loss_requests_a_restart() {
        let restarter = RecordingRestarter::default();

        restart_after_loss(&restarter, Duration::from_millis(1), "broker went away").await;

        assert_eq!(restarter.reasons(), vec![RestartReason::SessionLost]);
    }

    #[tokio::test]
    async fn failed_initial_connect_is_returned() {
        let broker = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..BrokerConfig::default()
        };
        let (context, _) = test_context();
        let session = SessionManager::create(&broker, context);

        let result = timeout(Duration::from_secs(10), session.start())
            .await
            .expect("connect attempt finished");

        assert!(matches!(result, Err(SessionError::Connection(_))));
    }

    #[tokio::test]
    async fn session_subscribes_dispatches_and_restarts_on_loss() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let broker = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
            ..BrokerConfig::default()
        };
        let fake_broker = tokio::spawn(one_shot_broker(listener));
        let (context, handles) = test_context();

        let session = timeout(
            Duration::from_secs(5),
            SessionManager::create(&broker, context).start(),
        )
        .await
        .expect("connect finished")
        .unwrap();
        let reason = timeout(Duration::from_secs(5), session.run())
            .await
            .expect("session ended");

        assert!(fake_broker.await.unwrap(), "no SUBSCRIBE for # seen");
        assert!(!reason.is_empty());
        // the dispatcher runs on its own task
        timeout(Duration::from_secs(1), async {
            while !handles.relay.is_on() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("relay switched on");
        assert_eq!(handles.restarter.reasons(), vec![RestartReason::SessionLost]);
    }
}
