//! # Link Monitor
//!
//! Owns Wi-Fi association for the device. The rest of the program only sees
//! three things: a blocking [`LinkMonitor::connect`], a cheap
//! [`LinkMonitor::check_connection`] used by the watchdog, and the
//! [`ConnectionEvent`] stream.
//!
//! ## Reconnect state machine
//!
//! ```text
//!                 ┌──────────── backoff (10s) ◄──────────┐
//!                 ▼                                       │
//! Disconnected ─► Connecting { attempt } ─► poll 10 × 200ms ─► Connected { ip }
//!      ▲                                                         │
//!      └──────────────── check_connection(): address gone ◄──────┘
//! ```
//!
//! The outer loop never gives up. "Connected" requires both a successful
//! association status and a usable IPv4 address, because DHCP can lag the
//! radio by several seconds.

pub mod monitor;
pub mod radio;
pub mod state;

pub use monitor::{spawn_watchdog, IpSource, LinkMonitor};
pub use radio::{NmcliRadio, WifiCredentials, WifiRadio};
pub use state::{ConnectionEvent, LinkState, LinkTiming};
