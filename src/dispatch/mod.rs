//! # Command Dispatcher
//!
//! Turns an inbound `(topic, payload)` pair into one action against the
//! injected collaborators and a confirmation publish:
//!
//! ```text
//! MqttMessage ──► Topics::classify ──► rules::resolve ──► Command
//!                 (exact equality)     (ordered substring rules)
//!                                                           │
//!                        relay / uptime / ip / restart ◄────┘ ──► reply topic
//! ```
//!
//! Dispatch is stateless. Messages that match no rule are dropped without a
//! reply or a log line.

pub mod dispatcher;
pub mod rules;

pub use dispatcher::CommandDispatcher;

use crate::device::ActuatorError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Relay actuation failed: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Blocking query failed: {0}")]
    Query(#[from] tokio::task::JoinError),
}
