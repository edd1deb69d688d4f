use tracing::{debug, warn};

use crate::command::{self, Command};
use crate::topic::{self, Action, DeviceRef};
use crate::tuya::DeviceCommand;

/// A fully resolved inbound message: which device, which call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub device: DeviceRef,
    pub command: DeviceCommand,
}

/// Decode an inbound topic/payload pair into a device dispatch.
///
/// Returns `None` for anything that should be ignored: incomplete device
/// identity, unrecognized action kind, or a command with no sendable
/// payload. Malformed input never errors.
pub fn route(topic_str: &str, payload: &str, prefix: &str) -> Option<Dispatch> {
    let decoded = topic::decode(topic_str, prefix);

    let Some(device) = decoded.device_ref() else {
        debug!("Incomplete device identity in topic '{}', ignoring", topic_str);
        return None;
    };
    let Some(action) = decoded.action else {
        debug!("Unrecognized action in topic '{}', ignoring", topic_str);
        return None;
    };

    let command = match action {
        Action::Command => {
            let cmd = command::translate(
                decoded.command_seg.as_deref(),
                decoded.dps_index.as_deref(),
                decoded.dps_command_seg.as_deref(),
                payload,
            );
            debug!("Translated command for {}: {:?}", device, cmd);
            match cmd {
                Command::Toggle => DeviceCommand::Toggle,
                other => match other.dps_payload() {
                    Some(dps) => DeviceCommand::Set(dps),
                    None => {
                        warn!("Command has no sendable payload, dropping: {:?}", other);
                        return None;
                    }
                },
            }
        }
        Action::Color => DeviceCommand::SetColor(payload.to_lowercase()),
    };

    Some(Dispatch { device, command })
}
