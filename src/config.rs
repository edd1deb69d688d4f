use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub tuya: TuyaConfig,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub client_id: String,
    /// Applied uniformly to every publish and subscribe.
    pub qos: u8,
    pub retain: bool,
}

#[derive(Debug, Clone)]
pub struct TuyaConfig {
    pub protocol_version: String,
}

fn env_required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{key} environment variable is required"))
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let config = Self {
            mqtt: MqttConfig {
                broker_host: env_required("MQTT_BROKER_HOST")?,
                broker_port: env_or_default("MQTT_BROKER_PORT", 1883),
                username: env_optional("MQTT_USERNAME"),
                password: env_optional("MQTT_PASSWORD"),
                topic_prefix: env_or_default("MQTT_TOPIC_PREFIX", "tuya".to_string()),
                client_id: env_or_default("MQTT_CLIENT_ID", "tuya-mqtt-bridge".to_string()),
                qos: env_or_default("MQTT_QOS", 2),
                retain: env_or_default("MQTT_RETAIN", false),
            },
            tuya: TuyaConfig {
                protocol_version: env_or_default("TUYA_PROTOCOL_VERSION", "3.3".to_string()),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.mqtt.broker_host.is_empty() {
            return Err("MQTT_BROKER_HOST must not be empty".into());
        }
        if self.mqtt.topic_prefix.is_empty() {
            return Err("MQTT_TOPIC_PREFIX must not be empty".into());
        }
        if self.mqtt.qos > 2 {
            return Err("MQTT_QOS must be 0, 1 or 2".into());
        }
        Ok(())
    }

    /// Wildcard pattern covering every device topic under the prefix.
    pub fn subscribe_pattern(&self) -> String {
        format!("{}/#", self.mqtt.topic_prefix.trim_end_matches('/'))
    }

    /// Availability topic carried by the broker Last Will.
    pub fn bridge_status_topic(&self) -> String {
        format!(
            "{}/bridge/state",
            self.mqtt.topic_prefix.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            mqtt: MqttConfig {
                broker_host: "localhost".into(),
                broker_port: 1883,
                username: None,
                password: None,
                topic_prefix: "tuya".into(),
                client_id: "test".into(),
                qos: 2,
                retain: false,
            },
            tuya: TuyaConfig {
                protocol_version: "3.3".into(),
            },
        }
    }

    #[test]
    fn subscribe_pattern_covers_all_sublevels() {
        assert_eq!(config().subscribe_pattern(), "tuya/#");
        assert_eq!(config().bridge_status_topic(), "tuya/bridge/state");
    }

    #[test]
    fn env_or_default_falls_back_on_unparsable_values() {
        // Uniquely named key so parallel tests can't race on it.
        let key = "TUYA_MQTT_BRIDGE_TEST_UNPARSABLE_PORT";
        unsafe { env::set_var(key, "abc") };
        assert_eq!(env_or_default(key, 1883u16), 1883);
        unsafe { env::remove_var(key) };
        assert_eq!(env_or_default(key, 7u16), 7);
    }

    #[test]
    fn validate_rejects_out_of_range_qos() {
        let mut config = config();
        config.mqtt.qos = 3;
        assert!(config.validate().is_err());
        config.mqtt.qos = 1;
        assert!(config.validate().is_ok());
    }
}
