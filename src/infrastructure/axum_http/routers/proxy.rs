use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};

use crate::{
    application::usecases::payload_resolver,
    auth::AuthUser,
    domain::value_objects::{
        forwarding::ForwardRequest,
        operations::{PROXY, proxy_backend_path},
    },
    infrastructure::{
        automation_http::client::AutomationClient,
        axum_http::{
            error_responses::{ErrorResponse, mirrored_response},
            extractors::RawOperationRequest,
        },
        postgres::postgres_connection::PgPoolSquad,
    },
};

use super::operations::{self, PgProxyPipeline};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    automation_client: Arc<AutomationClient>,
    capture_payloads: bool,
) -> Router {
    let pipeline = Arc::new(operations::proxy_pipeline(
        &db_pool,
        &automation_client,
        capture_payloads,
    ));

    Router::new()
        .route("/proxy", any(proxy_operation))
        .with_state(pipeline)
}

/// Escape hatch for backend endpoints the catalog does not name.
/// `instance_id`, `endpoint` and an optional `method` override travel
/// inside the payload itself and are stripped before forwarding.
pub async fn proxy_operation(
    State(pipeline): State<Arc<PgProxyPipeline>>,
    auth: AuthUser,
    method: Method,
    RawOperationRequest(parts): RawOperationRequest,
) -> Response {
    let instance_id = match payload_resolver::control_value(&parts, "instance_id") {
        Some(value) if !value.is_empty() => value,
        _ => return bad_request("instance_id is required"),
    };
    let endpoint = match payload_resolver::control_value(&parts, "endpoint") {
        Some(value) if !value.is_empty() => value,
        _ => return bad_request("endpoint is required"),
    };
    let forward_method = payload_resolver::control_value(&parts, "method")
        .and_then(|raw| Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).ok())
        .unwrap_or(method);

    let payload = payload_resolver::resolve(parts);
    let backend_path = proxy_backend_path(&instance_id, &endpoint);
    let request = ForwardRequest::new(forward_method, backend_path, payload);

    match pipeline
        .execute(auth.context(), &PROXY, &instance_id, request)
        .await
    {
        Ok(outcome) => mirrored_response(outcome.status, outcome.body),
        Err(err) => err.into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            code: "bad_request".to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
