pub mod client;
pub mod registry;

use crate::topic::DeviceRef;

/// A command bound for one device session.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Set the given dps object, e.g. `{"1": true}`.
    Set(serde_json::Value),
    /// Invert the device's power state (dps 1).
    Toggle,
    /// Set the device colour from an `rrggbb` hex string.
    SetColor(String),
}

/// A dps snapshot reported by a device, ready for state publication.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub device: DeviceRef,
    pub dps: serde_json::Map<String, serde_json::Value>,
}
