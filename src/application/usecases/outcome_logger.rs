use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric};
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{PipelineError, PipelineResult},
    domain::{
        entities::usage_logs::InsertUsageLogEntity,
        repositories::usage_logs::UsageLogRepository,
        value_objects::{
            enums::{delivery_statuses::DeliveryStatus, directions::Direction},
            forwarding::ForwardResponse,
        },
    },
};

const SYNTHETIC_ID_PREFIX: &str = "LOG-";

/// Who a usage row belongs to. `instance_id` is absent when the row
/// records a provisioning attempt that produced no instance.
#[derive(Debug, Clone)]
pub struct UsageRefs {
    pub instance_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub subscription_id: Uuid,
}

/// Appends one immutable usage row per forwarded attempt. Payload
/// capture is off unless the operator opted in.
pub struct OutcomeLogger<L>
where
    L: UsageLogRepository + Send + Sync + 'static,
{
    usage_log_repo: Arc<L>,
    capture_payloads: bool,
}

impl<L> OutcomeLogger<L>
where
    L: UsageLogRepository + Send + Sync + 'static,
{
    pub fn new(usage_log_repo: Arc<L>, capture_payloads: bool) -> Self {
        Self {
            usage_log_repo,
            capture_payloads,
        }
    }

    /// Records a backend response. Delivery counts as sent only for
    /// 2xx statuses; anything else is a failed attempt that still
    /// consumed quota.
    pub async fn record_delivery(
        &self,
        refs: &UsageRefs,
        request_payload: &Map<String, Value>,
        response: &ForwardResponse,
    ) -> PipelineResult<String> {
        let message_id = response
            .json()
            .and_then(extract_message_id)
            .unwrap_or_else(synthetic_id);
        let status = if response.is_success() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };

        self.append(
            refs,
            message_id.clone(),
            status,
            request_payload,
            response.json().cloned(),
        )
        .await?;

        Ok(message_id)
    }

    /// Records an attempt the backend never answered.
    pub async fn record_unavailable(
        &self,
        refs: &UsageRefs,
        request_payload: &Map<String, Value>,
        detail: &str,
    ) -> PipelineResult<String> {
        let message_id = synthetic_id();
        let response_payload = serde_json::json!({ "error": detail });

        self.append(
            refs,
            message_id.clone(),
            DeliveryStatus::Failed,
            request_payload,
            Some(response_payload),
        )
        .await?;

        Ok(message_id)
    }

    async fn append(
        &self,
        refs: &UsageRefs,
        message_id: String,
        status: DeliveryStatus,
        request_payload: &Map<String, Value>,
        response_payload: Option<Value>,
    ) -> PipelineResult<()> {
        let entity = InsertUsageLogEntity {
            instance_id: refs.instance_id,
            message_id: message_id.clone(),
            status: status.to_string(),
            direction: Direction::Outbound.to_string(),
            customer_id: refs.customer_id,
            subscription_id: refs.subscription_id,
            request_payload: self
                .capture_payloads
                .then(|| Value::Object(request_payload.clone())),
            response_payload: if self.capture_payloads {
                response_payload
            } else {
                None
            },
        };

        let log_id = self.usage_log_repo.insert(entity).await.map_err(|err| {
            error!(
                %message_id,
                subscription_id = %refs.subscription_id,
                db_error = ?err,
                "outcome_logger: failed to append usage log"
            );
            PipelineError::Internal(err)
        })?;

        info!(
            %log_id,
            %message_id,
            status = %status,
            subscription_id = %refs.subscription_id,
            "outcome_logger: usage log appended"
        );
        Ok(())
    }
}

/// Correlation id from the backend body: `key.id`, then `id`, then
/// `messageId`. Empty strings do not count.
fn extract_message_id(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/key/id"),
        body.get("id"),
        body.get("messageId"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

fn synthetic_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("{}{}", SYNTHETIC_ID_PREFIX, suffix)
}
