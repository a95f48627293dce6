use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum InstanceStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Deleted,
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            InstanceStatus::Disconnected => "disconnected",
            InstanceStatus::Connecting => "connecting",
            InstanceStatus::Connected => "connected",
            InstanceStatus::Deleted => "deleted",
        };
        write!(f, "{}", status)
    }
}

impl InstanceStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "disconnected" => InstanceStatus::Disconnected,
            "connecting" => InstanceStatus::Connecting,
            "connected" => InstanceStatus::Connected,
            "deleted" => InstanceStatus::Deleted,
            _ => InstanceStatus::Disconnected,
        }
    }

    /// Maps the connection state reported by the automation backend.
    /// Anything the backend does not positively report as connected or
    /// connecting is treated as disconnected.
    pub fn from_backend_report(value: &str) -> Self {
        match value {
            "connected" => InstanceStatus::Connected,
            "connecting" => InstanceStatus::Connecting,
            _ => InstanceStatus::Disconnected,
        }
    }
}
