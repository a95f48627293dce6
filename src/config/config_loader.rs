use anyhow::{Ok, Result};

use super::config_model::{Audit, AuthSecret, Automation, Database, DotEnvyConfig, Server};
use crate::config::stage::Stage;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let automation = Automation {
        base_url: std::env::var("AUTOMATION_BASE_URL").expect("AUTOMATION_BASE_URL is invalid"),
        timeout: std::env::var("AUTOMATION_TIMEOUT")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?,
    };

    let audit = Audit {
        capture_payloads: std::env::var("CAPTURE_AUDIT_PAYLOADS")
            .map(|value| value == "true" || value == "1")
            .unwrap_or(false),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        automation,
        audit,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_auth_secret() -> Result<AuthSecret> {
    dotenvy::dotenv().ok();

    Ok(AuthSecret {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    })
}
