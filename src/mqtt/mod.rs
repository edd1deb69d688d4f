pub mod client;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Advisory liveness check: polls the shared connected flag on a fixed
/// interval and logs transition edges. Abort the handle on shutdown.
pub fn spawn_connection_monitor(
    connected: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last: Option<bool> = None;
        loop {
            ticker.tick().await;
            let now = connected.load(Ordering::Relaxed);
            if last != Some(now) {
                if now {
                    info!("MQTT broker connected");
                } else {
                    info!("MQTT broker not connected");
                }
                last = Some(now);
            }
        }
    })
}
