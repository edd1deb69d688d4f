use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::topic::DeviceRef;

use super::client::DeviceSession;
use super::{DeviceCommand, DeviceEvent};

/// Owns one session task per device, spawned on first use. Sessions are
/// keyed by device identity; their snapshots all flow into one shared
/// event channel.
pub struct DeviceRegistry {
    protocol_version: String,
    event_tx: mpsc::Sender<DeviceEvent>,
    sessions: HashMap<DeviceRef, mpsc::Sender<DeviceCommand>>,
    handles: Vec<JoinHandle<()>>,
}

impl DeviceRegistry {
    pub fn new(protocol_version: String, event_tx: mpsc::Sender<DeviceEvent>) -> Self {
        Self {
            protocol_version,
            event_tx,
            sessions: HashMap::new(),
            handles: Vec::new(),
        }
    }

    /// Route a command to the device's session, spawning one if the
    /// device has not been seen before. Construction failures (bad
    /// address) are logged and the command is dropped.
    pub async fn dispatch(&mut self, device: DeviceRef, command: DeviceCommand) {
        if !self.sessions.contains_key(&device) {
            let ip: IpAddr = match device.address.parse() {
                Ok(ip) => ip,
                Err(e) => {
                    warn!("Invalid device address '{}': {}", device.address, e);
                    return;
                }
            };

            let (cmd_tx, cmd_rx) = mpsc::channel::<DeviceCommand>(50);
            let session =
                DeviceSession::new(device.clone(), ip, self.protocol_version.clone());
            let event_tx = self.event_tx.clone();

            info!("Starting session for device {}", device);
            let handle = tokio::spawn(async move {
                session.run(event_tx, cmd_rx).await;
            });

            self.sessions.insert(device.clone(), cmd_tx);
            self.handles.push(handle);
        }

        if let Some(cmd_tx) = self.sessions.get(&device) {
            if cmd_tx.send(command).await.is_err() {
                warn!("Command channel closed for device {}", device);
                self.sessions.remove(&device);
            }
        }
    }

    /// Tear down every session task.
    pub fn disconnect_all(&mut self) {
        info!("Disconnecting {} device session(s)", self.sessions.len());
        self.sessions.clear();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}
