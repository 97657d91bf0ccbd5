//! # MQTT Session Module
//!
//! Everything that touches the broker lives here. The rest of the crate only
//! sees the [`Publisher`] trait and the [`MqttMessage`] record.
//!
//! ```text
//! mqtt/
//! ├── config.rs           - BrokerConfig → rumqttc::MqttOptions
//! ├── error.rs            - SessionError
//! ├── message_manager.rs  - inbound message record
//! ├── mqtt_handler.rs     - Session Manager state machine and event loop
//! ├── publisher.rs        - fire-and-forget publish contract
//! └── topics.rs           - home/<device>/… namespace
//! ```
//!
//! The session subscribes to `#` at QoS 1 ("at least once") and publishes
//! at the same level. Delivery guarantees end there: nothing is persisted
//! and nothing is re-sent by the application.

pub mod config;
pub mod error;
pub mod message_manager;
pub mod mqtt_handler;
pub mod publisher;
pub mod topics;

pub use message_manager::MqttMessage;
pub use mqtt_handler::SessionManager;
pub use publisher::Publisher;
pub use topics::{InboundTopic, Topics};
