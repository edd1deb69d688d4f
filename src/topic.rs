use std::hash::{Hash, Hasher};

/// Identity of one controllable device, as carried in the topic path.
#[derive(Debug, Clone)]
pub struct DeviceRef {
    pub id: String,
    pub key: String,
    pub address: String,
    pub type_prefix: Option<String>,
}

// Equality is structural on (id, key, address); the type prefix only
// affects outbound topic layout.
impl PartialEq for DeviceRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.key == other.key && self.address == other.address
    }
}

impl Eq for DeviceRef {}

impl Hash for DeviceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.key.hash(state);
        self.address.hash(state);
    }
}

impl std::fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Command,
    Color,
}

impl Action {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "command" => Some(Action::Command),
            "color" => Some(Action::Color),
            _ => None,
        }
    }
}

/// Result of decoding an inbound topic. Decoding never fails; segments
/// that are missing from the topic simply come back as `None` and the
/// caller drops the message.
#[derive(Debug, Default, Clone)]
pub struct DecodedTopic {
    pub id: Option<String>,
    pub key: Option<String>,
    pub address: Option<String>,
    pub action: Option<Action>,
    pub command_seg: Option<String>,
    pub dps_index: Option<String>,
    pub dps_command_seg: Option<String>,
}

impl DecodedTopic {
    /// The device identity, if every field was present in the topic.
    pub fn device_ref(&self) -> Option<DeviceRef> {
        match (&self.id, &self.key, &self.address) {
            (Some(id), Some(key), Some(address))
                if !id.is_empty() && !key.is_empty() && !address.is_empty() =>
            {
                Some(DeviceRef {
                    id: id.clone(),
                    key: key.clone(),
                    address: address.clone(),
                    type_prefix: None,
                })
            }
            _ => None,
        }
    }
}

/// Decode a topic against the configured root prefix.
///
/// Segment grammar after the prefix:
/// `{id}/{key}/{address}/{action}/{token}` for simple commands, or
/// `{id}/{key}/{address}/command/dps/{index}/{token}` for DPS-indexed
/// commands ("dps" is matched case-insensitively).
pub fn decode(topic: &str, prefix: &str) -> DecodedTopic {
    let rest = match topic.strip_prefix(prefix.trim_end_matches('/')) {
        Some(r) if r.is_empty() => r,
        Some(r) if r.starts_with('/') => &r[1..],
        _ => topic,
    };

    let segments: Vec<&str> = rest.split('/').collect();
    let seg = |i: usize| segments.get(i).map(|s| s.to_string());

    let mut decoded = DecodedTopic {
        id: seg(0),
        key: seg(1),
        address: seg(2),
        action: segments.get(3).and_then(|s| Action::parse(s)),
        command_seg: seg(4),
        ..Default::default()
    };

    let is_dps = segments.len() > 6
        && segments
            .get(4)
            .is_some_and(|s| s.eq_ignore_ascii_case("dps"));
    if is_dps {
        decoded.dps_index = seg(5);
        decoded.dps_command_seg = seg(6);
    }

    decoded
}

/// Build an outbound topic: `prefix/[type_prefix/]id/key/address/suffix`.
pub fn encode(prefix: &str, device: &DeviceRef, suffix: &str) -> String {
    let mut topic = String::from(prefix.trim_end_matches('/'));
    topic.push('/');
    if let Some(type_prefix) = &device.type_prefix {
        topic.push_str(type_prefix);
        topic.push('/');
    }
    topic.push_str(&device.id);
    topic.push('/');
    topic.push_str(&device.key);
    topic.push('/');
    topic.push_str(&device.address);
    topic.push('/');
    topic.push_str(suffix);
    topic
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceRef {
        DeviceRef {
            id: "bf1234".into(),
            key: "0123456789abcdef".into(),
            address: "192.168.1.40".into(),
            type_prefix: None,
        }
    }

    #[test]
    fn decodes_simple_command_topic() {
        let d = decode("tuya/bf1234/0123456789abcdef/192.168.1.40/command/on", "tuya");
        assert_eq!(d.action, Some(Action::Command));
        assert_eq!(d.command_seg.as_deref(), Some("on"));
        assert!(d.dps_index.is_none());
        let device = d.device_ref().unwrap();
        assert_eq!(device.id, "bf1234");
        assert_eq!(device.key, "0123456789abcdef");
        assert_eq!(device.address, "192.168.1.40");
    }

    #[test]
    fn decodes_dps_command_topic() {
        let d = decode("tuya/id/key/1.2.3.4/command/dps/8/high", "tuya");
        assert_eq!(d.action, Some(Action::Command));
        assert_eq!(d.dps_index.as_deref(), Some("8"));
        assert_eq!(d.dps_command_seg.as_deref(), Some("high"));
    }

    #[test]
    fn dps_marker_is_case_insensitive() {
        let d = decode("tuya/id/key/1.2.3.4/command/DPS/5/cool", "tuya");
        assert_eq!(d.dps_index.as_deref(), Some("5"));
        assert_eq!(d.dps_command_seg.as_deref(), Some("cool"));
    }

    #[test]
    fn dps_marker_without_token_is_not_dps_form() {
        // "dps" in the command slot but no trailing token segment.
        let d = decode("tuya/id/key/1.2.3.4/command/dps/7", "tuya");
        assert!(d.dps_index.is_none());
        assert_eq!(d.command_seg.as_deref(), Some("dps"));
    }

    #[test]
    fn short_topic_yields_incomplete_identity() {
        let d = decode("tuya/id/key", "tuya");
        assert!(d.device_ref().is_none());
        assert!(d.action.is_none());
    }

    #[test]
    fn unknown_action_decodes_to_none() {
        let d = decode("tuya/id/key/1.2.3.4/reboot/now", "tuya");
        assert!(d.action.is_none());
        assert!(d.device_ref().is_some());
    }

    #[test]
    fn prefix_with_trailing_slash_is_tolerated() {
        let d = decode("tuya/id/key/1.2.3.4/color/ff0000", "tuya/");
        assert_eq!(d.action, Some(Action::Color));
        assert_eq!(d.command_seg.as_deref(), Some("ff0000"));
    }

    #[test]
    fn encode_without_type_prefix() {
        assert_eq!(
            encode("tuya", &device(), "state"),
            "tuya/bf1234/0123456789abcdef/192.168.1.40/state"
        );
    }

    #[test]
    fn encode_with_type_prefix() {
        let mut d = device();
        d.type_prefix = Some("socket".into());
        assert_eq!(
            encode("tuya", &d, "dps"),
            "tuya/socket/bf1234/0123456789abcdef/192.168.1.40/dps"
        );
    }

    #[test]
    fn encode_decode_round_trip_recovers_identity() {
        let encoded = encode("tuya", &device(), "dps");
        let decoded = decode(&encoded, "tuya");
        assert_eq!(decoded.device_ref().unwrap(), device());
    }
}
