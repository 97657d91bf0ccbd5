mod config;
mod context;
mod device;
mod dispatch;
mod link;
mod mqtt;
mod reporter;
#[cfg(test)]
mod testing;

use crate::config::DeviceConfig;
use crate::context::DeviceContext;
use crate::link::{spawn_watchdog, ConnectionEvent, LinkMonitor, LinkState};
use crate::mqtt::SessionManager;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(DeviceConfig::default_path);
    let config = DeviceConfig::load_or_create(&config_path).await?;
    info!(
        "Starting device {} with config {}",
        config.device.name,
        config_path.display()
    );

    let context = DeviceContext::from_config(&config)?;

    let ip = context.link.connect().await;
    info!("Network ready at {}", ip);

    let _watchdog = spawn_watchdog(context.link.clone(), context.timing.link_watchdog);
    let _event_logger = spawn_event_logger(&context.link);

    let session = SessionManager::create(&config.broker, context)
        .start()
        .await
        .map_err(|e| eyre!("Failed to start MQTT session: {}", e))?;

    let reason = session.run().await;
    Err(eyre!("MQTT session ended: {}", reason))
}

fn spawn_event_logger(link: &Arc<LinkMonitor>) -> JoinHandle<()> {
    let mut events = link.subscribe();
    let mut states = link.watch_state();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ConnectionEvent::Lost) => warn!("Link event: connection lost"),
                    Ok(ConnectionEvent::Restored) => info!("Link event: connection restored"),
                    Err(RecvError::Lagged(skipped)) => warn!("Missed {} link events", skipped),
                    Err(RecvError::Closed) => break,
                },
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match states.borrow_and_update().clone() {
                        LinkState::Disconnected => debug!("Link state: disconnected"),
                        LinkState::Connecting { attempt } => {
                            debug!("Link state: connecting, attempt {}", attempt)
                        }
                        LinkState::Connected { ip } => debug!("Link state: connected as {}", ip),
                    }
                }
            }
        }
    })
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
