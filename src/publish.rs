use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::topic::{self, DeviceRef};

/// One topic/payload pair bound for the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
}

/// Mirrors device-reported state back onto the bus. Messages are handed
/// to the MQTT event-loop task over a channel; when the broker is not
/// connected the publisher drops them instead of queueing.
pub struct StatePublisher {
    prefix: String,
    connected: Arc<AtomicBool>,
    tx: mpsc::Sender<OutboundMessage>,
}

fn bmap(state: bool) -> &'static str {
    if state { "ON" } else { "OFF" }
}

impl StatePublisher {
    pub fn new(
        prefix: String,
        connected: Arc<AtomicBool>,
        tx: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self { prefix, connected, tx }
    }

    fn ready(&self, device: &DeviceRef) -> bool {
        if !self.connected.load(Ordering::Relaxed) {
            debug!("Broker not connected, skipping state publish for {}", device);
            return false;
        }
        if device.id.is_empty() || device.key.is_empty() || device.address.is_empty() {
            debug!("Incomplete device identity, skipping state publish");
            return false;
        }
        true
    }

    async fn send(&self, topic: String, payload: String) {
        debug!("State update: {} -> {}", topic, payload);
        if self
            .tx
            .send(OutboundMessage { topic, payload })
            .await
            .is_err()
        {
            warn!("Outbound publish channel closed");
        }
    }

    /// Publish the device power state as "ON"/"OFF" at `.../state`.
    pub async fn publish_status(&self, device: &DeviceRef, on: bool) {
        if !self.ready(device) {
            return;
        }
        let topic = topic::encode(&self.prefix, device, "state");
        self.send(topic, bmap(on).to_string()).await;
    }

    /// Publish the full snapshot at `.../dps`, then each entry at
    /// `.../dps/{index}`, aggregate first.
    pub async fn publish_dps(
        &self,
        device: &DeviceRef,
        snapshot: &serde_json::Map<String, Value>,
    ) {
        if !self.ready(device) {
            return;
        }
        let base = topic::encode(&self.prefix, device, "dps");
        self.send(base.clone(), Value::Object(snapshot.clone()).to_string())
            .await;
        for (index, value) in ordered_entries(snapshot) {
            self.send(format!("{base}/{index}"), value.to_string()).await;
        }
    }
}

/// Snapshot entries with integer-like keys first in numeric order
/// (devices number their dps), remaining keys lexicographic.
fn ordered_entries(snapshot: &serde_json::Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = snapshot.iter().collect();
    entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    entries
}
