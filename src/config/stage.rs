use std::fmt::Display;

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    #[default]
    Local,
    Production,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Local => "local",
            Stage::Production => "production",
        };
        write!(f, "{}", stage)
    }
}

impl TryFrom<&String> for Stage {
    type Error = anyhow::Error;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "local" => Ok(Stage::Local),
            "production" => Ok(Stage::Production),
            _ => Err(anyhow::anyhow!("Unknown stage: {}", value)),
        }
    }
}
