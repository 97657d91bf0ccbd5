//! Restart capability
//!
//! Restarting is the only way the core terminates: either on an explicit
//! `reboot` command or after the broker session is lost. It is injected as a
//! trait object so tests can record the request instead of ending the process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Command;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// `reboot` received on the system topic
    RebootCommand,
    /// Broker connection closed or failed
    SessionLost,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::RebootCommand => write!(f, "reboot command"),
            RestartReason::SessionLost => write!(f, "session lost"),
        }
    }
}

pub trait Restarter: Send + Sync {
    /// Real implementations do not return.
    fn restart_process(&self, reason: RestartReason);
}

/// How [`SystemRestarter`] restarts the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Exit the process and let the service supervisor start it again
    #[default]
    Exit,
    /// Reboot the host via `systemctl reboot`
    Reboot,
}

#[derive(Debug, Clone)]
pub struct SystemRestarter {
    mode: RestartMode,
}

impl SystemRestarter {
    pub fn new(mode: RestartMode) -> Self {
        Self { mode }
    }
}

impl Restarter for SystemRestarter {
    fn restart_process(&self, reason: RestartReason) {
        warn!("Restarting device ({}), mode {:?}", reason, self.mode);

        if self.mode == RestartMode::Reboot {
            match Command::new("systemctl").arg("reboot").status() {
                Ok(status) if status.success() => {}
                Ok(status) => error!("systemctl reboot exited with {}", status),
                Err(e) => error!("Failed to invoke systemctl reboot: {}", e),
            }
        }

        std::process::exit(1);
    }
}
