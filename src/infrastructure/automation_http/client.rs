use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::error;

use crate::{
    application::interfaces::automation::{AutomationGateway, ForwardError},
    config::config_model::Automation,
    domain::value_objects::forwarding::{
        BodyEncoding, ForwardRequest, ForwardResponse, ResponseBody,
    },
};

/// Minimal automation backend client built on reqwest.
pub struct AutomationClient {
    http: reqwest::Client,
    base_url: String,
}

impl AutomationClient {
    pub fn new(config: &Automation) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}

/// Query and form slots only take strings, so non-string JSON values
/// are rendered in their literal form ("true", "42").
fn flatten(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl AutomationGateway for AutomationClient {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ForwardError> {
        let url = self.endpoint(&request.path);
        let builder = self.http.request(request.method.clone(), &url);

        let builder = match request.encoding() {
            BodyEncoding::QueryOnly => {
                let pairs = request
                    .payload
                    .iter()
                    .map(|(key, value)| (key.clone(), flatten(value)))
                    .collect::<Vec<(String, String)>>();

                builder.query(&pairs)
            }
            BodyEncoding::Json => builder.json(&Value::Object(request.payload.clone())),
            BodyEncoding::Multipart => {
                let mut form = Form::new();

                for (key, value) in &request.payload {
                    form = form.text(key.clone(), flatten(value));
                }

                for file in &request.files {
                    let mut part =
                        Part::bytes(file.content.to_vec()).file_name(file.file_name.clone());
                    if let Some(content_type) = &file.content_type {
                        part = part
                            .mime_str(content_type)
                            .map_err(|err| ForwardError::Internal(err.into()))?;
                    }

                    form = form.part(file.field.clone(), part);
                }

                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(|err| {
            error!(url = %url, forward_error = %err, "automation client: request failed");
            ForwardError::Unavailable(err.to_string())
        })?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        let bytes = response.bytes().await.map_err(|err| {
            error!(url = %url, forward_error = %err, "automation client: failed to read response body");
            ForwardError::Unavailable(err.to_string())
        })?;

        let body = if is_json {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Raw(bytes),
            }
        } else {
            ResponseBody::Raw(bytes)
        };

        Ok(ForwardResponse { status, body })
    }
}
