use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Direction {
    #[default]
    Outbound,
    Inbound,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        };
        write!(f, "{}", direction)
    }
}

impl Direction {
    pub fn from_str(value: &str) -> Self {
        match value {
            "outbound" => Direction::Outbound,
            "inbound" => Direction::Inbound,
            _ => Direction::Outbound,
        }
    }
}
