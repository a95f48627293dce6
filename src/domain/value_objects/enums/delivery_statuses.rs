use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum DeliveryStatus {
    Sent,
    #[default]
    Failed,
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        };
        write!(f, "{}", status)
    }
}

impl DeliveryStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "sent" => DeliveryStatus::Sent,
            "failed" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Failed,
        }
    }
}
