use std::time::{Duration, Instant};

/// Source of the pre-formatted uptime string published on the `uptime` topic.
pub trait UptimeProvider: Send + Sync {
    fn uptime(&self) -> String;
}

/// Uptime measured from the moment the provider was created (process start).
#[derive(Debug, Clone)]
pub struct ProcessUptime {
    started: Instant,
}

impl ProcessUptime {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for ProcessUptime {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeProvider for ProcessUptime {
    fn uptime(&self) -> String {
        format_uptime(self.started.elapsed())
    }
}

/// Formats as `"<d> days, HH:MM:SS"`.
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{} days, {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}
