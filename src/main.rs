mod bridge;
mod command;
mod config;
mod mapping;
mod mqtt;
mod publish;
mod topic;
mod tuya;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting tuya-mqtt-bridge (mqtt={}:{}, prefix={}, qos={}, retain={})",
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.mqtt.topic_prefix,
        config.mqtt.qos,
        config.mqtt.retain,
    );

    // Channels
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<mqtt::client::MqttMessage>(100);
    let (outbound_tx, outbound_rx) = mpsc::channel::<publish::OutboundMessage>(100);
    let (event_tx, mut event_rx) = mpsc::channel::<tuya::DeviceEvent>(200);

    // MQTT event loop (handles both inbound commands and outbound state)
    let mqtt_client = mqtt::client::MqttClient::new(&config);
    let connected = mqtt_client.connected_flag();
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(inbound_tx, outbound_rx).await;
    });

    let monitor_handle =
        mqtt::spawn_connection_monitor(connected.clone(), Duration::from_millis(1500));

    let publisher = publish::StatePublisher::new(
        config.mqtt.topic_prefix.clone(),
        connected,
        outbound_tx,
    );
    let mut registry =
        tuya::registry::DeviceRegistry::new(config.tuya.protocol_version.clone(), event_tx);

    let prefix = config.mqtt.topic_prefix.clone();

    // Main loop: decode and route inbound messages, mirror device state,
    // handle shutdown signals.
    loop {
        tokio::select! {
            Some(msg) = inbound_rx.recv() => {
                if let Some(dispatch) = bridge::route(&msg.topic, &msg.payload, &prefix) {
                    registry.dispatch(dispatch.device, dispatch.command).await;
                }
            }
            Some(event) = event_rx.recv() => {
                if let Some(status) = event.dps.get("1").and_then(|v| v.as_bool()) {
                    publisher.publish_status(&event.device, status).await;
                }
                publisher.publish_dps(&event.device, &event.dps).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = async {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            } => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    // Cleanup
    registry.disconnect_all();
    monitor_handle.abort();
    mqtt_handle.abort();
    info!("tuya-mqtt-bridge stopped");
}
