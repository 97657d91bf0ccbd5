//! Hardware-facing collaborators of the command core
//!
//! The dispatcher never touches GPIO, clocks or the host power state directly.
//! It talks to these narrow traits instead, which keeps every command path
//! testable with in-memory doubles:
//!
//! ```text
//! CommandDispatcher ──► RelayActuator   (turn_on / turn_off / is_on)
//!                   ──► UptimeProvider  (pre-formatted uptime string)
//!                   ──► Restarter       (terminal: process or host restart)
//! ```

pub mod relay;
pub mod restart;
pub mod uptime;

pub use relay::{ActuatorError, GpioRelay, RelayActuator, SimulatedRelay};
pub use restart::{RestartMode, RestartReason, Restarter, SystemRestarter};
pub use uptime::{ProcessUptime, UptimeProvider};
