use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::publish::OutboundMessage;

/// An inbound bus message handed to the bridge loop.
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    config: Config,
}

fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

impl MqttClient {
    pub fn new(config: &Config) -> Self {
        let mut mqttopts = MqttOptions::new(
            &config.mqtt.client_id,
            &config.mqtt.broker_host,
            config.mqtt.broker_port,
        );
        mqttopts.set_keep_alive(std::time::Duration::from_secs(30));

        if let (Some(user), Some(pass)) = (&config.mqtt.username, &config.mqtt.password) {
            mqttopts.set_credentials(user, pass);
        }

        // LWT: mark the bridge offline when the broker loses us.
        let lwt = rumqttc::LastWill::new(
            config.bridge_status_topic(),
            "offline".as_bytes().to_vec(),
            qos_from(config.mqtt.qos),
            true,
        );
        mqttopts.set_last_will(lwt);

        let (client, eventloop) = AsyncClient::new(mqttopts, 100);

        Self {
            client,
            eventloop,
            connected: Arc::new(AtomicBool::new(false)),
            config: config.clone(),
        }
    }

    /// Shared connection flag, observed by the state publisher and the
    /// liveness monitor.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    /// Run the MQTT event loop. Subscribes to the device wildcard on
    /// connect, forwards incoming publishes through `inbound_tx`, and
    /// publishes outbound state messages received from `outbound_rx`.
    pub async fn run(
        mut self,
        inbound_tx: mpsc::Sender<MqttMessage>,
        mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    ) {
        let qos = qos_from(self.config.mqtt.qos);
        let retain = self.config.mqtt.retain;
        let pattern = self.config.subscribe_pattern();

        loop {
            tokio::select! {
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(incoming)) => match incoming {
                            Incoming::ConnAck(_) => {
                                info!("Connected to MQTT broker");
                                self.connected.store(true, Ordering::Relaxed);

                                let status_topic = self.config.bridge_status_topic();
                                if let Err(e) = self
                                    .client
                                    .publish(&status_topic, qos, true, "online")
                                    .await
                                {
                                    error!("Failed to publish online status: {}", e);
                                }

                                if let Err(e) = self.client.subscribe(&pattern, qos).await {
                                    error!("Failed to subscribe to {}: {}", pattern, e);
                                }
                            }
                            Incoming::Publish(publish) => {
                                let payload =
                                    String::from_utf8_lossy(&publish.payload).to_string();
                                let msg = MqttMessage {
                                    topic: publish.topic.clone(),
                                    payload,
                                };
                                if inbound_tx.send(msg).await.is_err() {
                                    warn!("Inbound message channel closed");
                                }
                            }
                            Incoming::Disconnect => {
                                warn!("MQTT broker sent disconnect");
                                self.connected.store(false, Ordering::Relaxed);
                            }
                            _ => {}
                        },
                        Ok(_) => {}
                        Err(e) => {
                            self.connected.store(false, Ordering::Relaxed);
                            error!("MQTT connection error: {}. Reconnecting...", e);
                            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                Some(msg) = outbound_rx.recv() => {
                    info!("Publishing {}: {}", msg.topic, msg.payload);
                    if let Err(e) = self
                        .client
                        .publish(&msg.topic, qos, retain, msg.payload.as_bytes())
                        .await
                    {
                        warn!("Failed to publish {}: {}", msg.topic, e);
                    }
                }
            }
        }
    }
}
