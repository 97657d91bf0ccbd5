//! Radio driver seam
//!
//! [`WifiRadio`] is synchronous: both association and the address query are
//! blocking driver calls, and the monitor runs each of them on the blocking
//! pool.

use std::fmt;
use std::process::Command;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

/// Outcome of one association request.
///
/// Failure variants exist for diagnostics only; every one of them is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationStatus {
    Success,
    AccessRevoked,
    InvalidCredential,
    NetworkNotAvailable,
    Timeout,
    UnspecifiedFailure,
    UnsupportedAuthenticationProtocol,
}

impl AssociationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AssociationStatus::Success)
    }

    pub fn description(&self) -> &'static str {
        match self {
            AssociationStatus::Success => "Association succeeded.",
            AssociationStatus::AccessRevoked => "Access to the network has been revoked.",
            AssociationStatus::InvalidCredential => "Invalid credential was presented.",
            AssociationStatus::NetworkNotAvailable => "Network is not available.",
            AssociationStatus::Timeout => "Connection attempt timed out.",
            AssociationStatus::UnspecifiedFailure => "Unspecified error [connection refused]",
            AssociationStatus::UnsupportedAuthenticationProtocol => {
                "Authentication protocol is not supported."
            }
        }
    }
}

impl fmt::Display for AssociationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

pub trait WifiRadio: Send + Sync + 'static {
    /// Requests association with the given network. May block for seconds.
    fn associate(&self, credentials: &WifiCredentials) -> AssociationStatus;

    /// Raw IPv4 address of the interface as the driver reports it.
    /// Empty or `0.0.0.0` while no address has been assigned.
    fn ipv4_address(&self) -> String;
}

/// Radio managed by NetworkManager, driven through `nmcli`.
#[derive(Clone, Debug)]
pub struct NmcliRadio {
    interface: String,
}

impl NmcliRadio {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

impl WifiRadio for NmcliRadio {
    fn associate(&self, credentials: &WifiCredentials) -> AssociationStatus {
        let output = Command::new("nmcli")
            .args(["--wait", "15", "device", "wifi", "connect"])
            .arg(&credentials.ssid)
            .arg("password")
            .arg(&credentials.password)
            .arg("ifname")
            .arg(&self.interface)
            .output();

        match output {
            Ok(output) if output.status.success() => AssociationStatus::Success,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("nmcli connect failed: {}", stderr.trim());
                classify_nmcli_failure(&stderr)
            }
            Err(e) => {
                debug!("Failed to run nmcli: {}", e);
                AssociationStatus::UnspecifiedFailure
            }
        }
    }

    fn ipv4_address(&self) -> String {
        let output = Command::new("nmcli")
            .args(["-g", "IP4.ADDRESS", "device", "show"])
            .arg(&self.interface)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                // Multiple addresses come back as "a/24 | b/24"
                stdout
                    .split('|')
                    .next()
                    .map(|first| first.trim().to_string())
                    .unwrap_or_default()
            }
            Ok(_) | Err(_) => String::new(),
        }
    }
}

/// Maps nmcli's error text onto the association failure classes.
pub fn classify_nmcli_failure(stderr: &str) -> AssociationStatus {
    let text = stderr.to_lowercase();

    if text.contains("secrets were required") || text.contains("psk: property is invalid") {
        AssociationStatus::InvalidCredential
    } else if text.contains("no network with ssid") || text.contains("not available") {
        AssociationStatus::NetworkNotAvailable
    } else if text.contains("timeout") || text.contains("timed out") {
        AssociationStatus::Timeout
    } else if text.contains("key-mgmt") || text.contains("not supported") {
        AssociationStatus::UnsupportedAuthenticationProtocol
    } else if text.contains("not authorized") || text.contains("access denied") {
        AssociationStatus::AccessRevoked
    } else {
        AssociationStatus::UnspecifiedFailure
    }
}
