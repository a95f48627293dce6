use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    application::usecases::errors::PipelineError,
    config::{config_loader, stage::Stage},
    domain::value_objects::forwarding::ResponseBody,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            PipelineError::Internal(_) if config_loader::get_stage() == Stage::Production => {
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Relays whatever the backend answered, status and body unchanged.
pub fn mirrored_response(status: u16, body: ResponseBody) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

    match body {
        ResponseBody::Json(value) => (status, Json(value)).into_response(),
        ResponseBody::Raw(bytes) => (status, bytes).into_response(),
    }
}
