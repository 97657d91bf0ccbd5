//! Background Reporter
//!
//! Announces the start of the device once on `home/<device>/start`, then
//! publishes the uptime string on `home/<device>/uptime` every interval for
//! the lifetime of the process. Missed ticks are skipped, never caught up.

use crate::device::UptimeProvider;
use crate::mqtt::{Publisher, Topics};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct BackgroundReporter {
    publisher: Arc<dyn Publisher>,
    uptime: Arc<dyn UptimeProvider>,
    topics: Topics,
    interval: Duration,
}

impl BackgroundReporter {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        uptime: Arc<dyn UptimeProvider>,
        topics: Topics,
        interval: Duration,
    ) -> Self {
        Self {
            publisher,
            uptime,
            topics,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "Starting background reporter with interval: {:?}",
            self.interval
        );

        tokio::spawn(async move {
            self.announce_start();

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.report_once();
            }
        })
    }

    fn announce_start(&self) {
        let now = chrono::Local::now();
        let notice = format!(
            "The system started on {} at {}",
            now.format("%Y-%m-%d"),
            now.format("%H:%M:%S")
        );

        if let Err(e) = self.publisher.publish_text(&self.topics.start, &notice) {
            warn!("Failed to publish start notice: {}", e);
        }
    }

    /// One liveness publish. Failures are logged and the schedule continues.
    pub fn report_once(&self) {
        let uptime = self.uptime.uptime();
        match self.publisher.publish_text(&self.topics.uptime, &uptime) {
            Ok(()) => debug!("Uptime reported: {}", uptime),
            Err(e) => warn!("Failed to publish uptime: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedUptime, RecordingPublisher};

    fn reporter(publisher: &Arc<RecordingPublisher>, interval: Duration) -> BackgroundReporter {
        BackgroundReporter::new(
            publisher.clone(),
            Arc::new(FixedUptime("3 days, 00:00:10".to_string())),
            Topics::new("nf2"),
            interval,
        )
    }

    #[test]
    fn report_once_publishes_uptime() {
        let publisher = Arc::new(RecordingPublisher::default());

        reporter(&publisher, Duration::from_secs(10)).report_once();

        assert_eq!(
            publisher.texts(),
            vec![("home/nf2/uptime".to_string(), "3 days, 00:00:10".to_string())]
        );
    }

    #[test]
    fn failed_publish_is_not_fatal() {
        let publisher = Arc::new(RecordingPublisher::default());
        publisher.fail_publishes();

        reporter(&publisher, Duration::from_secs(10)).report_once();

        assert!(publisher.texts().is_empty());
    }

    #[tokio::test]
    async fn spawned_task_announces_start_then_reports_repeatedly() {
        let publisher = Arc::new(RecordingPublisher::default());
        let handle = reporter(&publisher, Duration::from_millis(5)).spawn();

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        let texts = publisher.texts();
        assert_eq!(texts[0].0, "home/nf2/start");
        assert!(texts[0].1.starts_with("The system started on "));

        let reports = texts.iter().filter(|(topic, _)| topic == "home/nf2/uptime").count();
        assert!(reports >= 2, "only {} reports", reports);
        assert!(texts[1..].iter().all(|(topic, _)| topic == "home/nf2/uptime"));
    }
}
