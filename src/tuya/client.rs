use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use rust_async_tuyapi::mesparse::CommandType;
use rust_async_tuyapi::tuyadevice::TuyaDevice;
use rust_async_tuyapi::{Payload, PayloadStruct};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::topic::DeviceRef;

use super::{DeviceCommand, DeviceEvent};

/// One device session: connects, forwards snapshots, executes commands,
/// reconnects with backoff on failure.
pub struct DeviceSession {
    device: DeviceRef,
    ip: IpAddr,
    protocol_version: String,
}

impl DeviceSession {
    pub fn new(device: DeviceRef, ip: IpAddr, protocol_version: String) -> Self {
        Self { device, ip, protocol_version }
    }

    pub async fn run(
        &self,
        event_tx: mpsc::Sender<DeviceEvent>,
        mut cmd_rx: mpsc::Receiver<DeviceCommand>,
    ) {
        let mut backoff = Duration::from_secs(5);
        let max_backoff = Duration::from_secs(60);
        // Last reported values, kept across reconnects so toggle still
        // knows the current power state.
        let mut last_dps: HashMap<String, Value> = HashMap::new();

        loop {
            info!("Connecting to device {}", self.device);

            match self
                .run_session(&event_tx, &mut cmd_rx, &mut last_dps)
                .await
            {
                Ok(()) => {
                    info!("Device {} session ended cleanly", self.device);
                    backoff = Duration::from_secs(5);
                }
                Err(e) => {
                    error!(
                        "Device {} session error: {}. Reconnecting in {:?}",
                        self.device, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
            }
        }
    }

    async fn run_session(
        &self,
        event_tx: &mpsc::Sender<DeviceEvent>,
        cmd_rx: &mut mpsc::Receiver<DeviceCommand>,
        last_dps: &mut HashMap<String, Value>,
    ) -> Result<(), String> {
        let mut device = TuyaDevice::new(
            &self.protocol_version,
            &self.device.id,
            Some(&self.device.key),
            self.ip,
        )
        .map_err(|e| format!("Failed to create device: {e:?}"))?;

        let mut receiver = device
            .connect()
            .await
            .map_err(|e| format!("Failed to connect: {e:?}"))?;

        info!("Connected to device {}", self.device);

        // Prime the dps cache with a full query.
        self.query_all_dps(&mut device).await?;

        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(10));
        heartbeat_interval.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    device.heartbeat().await
                        .map_err(|e| format!("Heartbeat failed: {e:?}"))?;
                }
                msg = receiver.recv() => {
                    match msg {
                        Some(Ok(messages)) => {
                            for m in messages {
                                if m.command == Some(CommandType::HeartBeat) {
                                    continue;
                                }
                                self.process_message(&m, event_tx, last_dps).await;
                            }
                        }
                        Some(Err(e)) => {
                            return Err(format!("Device error: {e:?}"));
                        }
                        None => {
                            return Err("Device channel closed".into());
                        }
                    }
                }
                Some(cmd) = cmd_rx.recv() => {
                    self.execute(&mut device, cmd, last_dps).await;
                }
            }
        }
    }

    /// Execute one command; failure is logged, never retried.
    async fn execute(
        &self,
        device: &mut TuyaDevice,
        cmd: DeviceCommand,
        last_dps: &HashMap<String, Value>,
    ) {
        let dps = match cmd {
            DeviceCommand::Set(dps) => dps,
            DeviceCommand::Toggle => {
                match last_dps.get("1").and_then(Value::as_bool) {
                    Some(current) => json!({"1": !current}),
                    None => {
                        warn!(
                            "Toggle for {} with unknown power state, dropping",
                            self.device
                        );
                        return;
                    }
                }
            }
            DeviceCommand::SetColor(color) => match tuya_color(&color) {
                Some(encoded) => json!({"2": "colour", "5": encoded}),
                None => {
                    warn!("Invalid color '{}' for {}, dropping", color, self.device);
                    return;
                }
            },
        };

        info!("Sending command to {}: {}", self.device, dps);
        match device.set_values(dps).await {
            Ok(_) => debug!("Set command completed for {}", self.device),
            Err(e) => warn!("Failed to send command to {}: {:?}", self.device, e),
        }
    }

    async fn query_all_dps(&self, device: &mut TuyaDevice) -> Result<(), String> {
        let payload = Payload::Struct(PayloadStruct {
            dev_id: self.device.id.clone(),
            gw_id: Some(self.device.id.clone()),
            uid: None,
            t: None,
            dp_id: None,
            dps: Some(json!({})),
        });

        device
            .get(payload)
            .await
            .map_err(|e| format!("DP query failed: {e:?}"))
    }

    async fn process_message(
        &self,
        msg: &rust_async_tuyapi::mesparse::Message,
        event_tx: &mpsc::Sender<DeviceEvent>,
        last_dps: &mut HashMap<String, Value>,
    ) {
        // Extract dps from whichever payload variant the library returns.
        // DP query responses sometimes arrive as Payload::String containing
        // JSON like {"dps":{"1":true,...}} instead of Payload::Struct.
        let dps_value: Option<Value> = match &msg.payload {
            Payload::Struct(ps) => ps.dps.clone(),
            Payload::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .and_then(|v| v.get("dps").cloned()),
            Payload::Raw(b) => {
                debug!("Payload::Raw ({} bytes), skipping", b.len());
                None
            }
            _ => None,
        };

        let Some(Value::Object(dps)) = dps_value else {
            debug!("No dps object in message from {}, skipping", self.device);
            return;
        };

        debug!("Device {} reported {} dps values", self.device, dps.len());

        for (index, value) in &dps {
            last_dps.insert(index.clone(), value.clone());
        }

        let event = DeviceEvent {
            device: self.device.clone(),
            dps,
        };
        if event_tx.send(event).await.is_err() {
            warn!("Device event channel closed");
        }
    }
}

/// Encode an `rrggbb` hex color into the Tuya colour dps value:
/// rgb (6 hex digits) + hue (4) + saturation (2) + value (2).
pub fn tuya_color(hex: &str) -> Option<String> {
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    let (h, s, v) = rgb_to_hsv(r, g, b);
    Some(format!("{hex}{h:04x}{s:02x}{v:02x}"))
}

/// RGB to HSV with hue in degrees (0..360) and saturation/value 0..255.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u16, u8, u8) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    (
        h.round() as u16 % 360,
        (s * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    )
}
