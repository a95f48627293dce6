use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    application::{
        interfaces::automation::AutomationGateway,
        usecases::{
            errors::{PipelineError, PipelineResult},
            ownership_resolver::OwnershipResolver,
        },
    },
    domain::{
        repositories::{customers::CustomerRepository, instances::InstanceRepository},
        value_objects::{
            enums::instance_statuses::InstanceStatus,
            forwarding::{ForwardRequest, ResponseBody},
            iam::RequestContext,
        },
    },
};

/// The backend's answer plus the connectivity we now believe in.
#[derive(Debug)]
pub struct StatusReport {
    pub status: u16,
    pub body: ResponseBody,
    pub connectivity: InstanceStatus,
}

/// Reads live connectivity from the backend and mirrors it into the
/// instance row. A status probe is a read: it consumes no quota and
/// leaves no usage row, which this type guarantees by never holding
/// the repositories those would need.
pub struct InstanceStatusUseCase<C, I, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    ownership: OwnershipResolver<C, I>,
    instance_repo: Arc<I>,
    gateway: Arc<G>,
}

impl<C, I, G> InstanceStatusUseCase<C, I, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    pub fn new(customer_repo: Arc<C>, instance_repo: Arc<I>, gateway: Arc<G>) -> Self {
        Self {
            ownership: OwnershipResolver::new(customer_repo, Arc::clone(&instance_repo)),
            instance_repo,
            gateway,
        }
    }

    pub async fn execute(
        &self,
        ctx: RequestContext,
        instance_id: &str,
        request: ForwardRequest,
    ) -> PipelineResult<StatusReport> {
        let (_, instance) = self
            .ownership
            .resolve_owned_instance(ctx, instance_id)
            .await?;

        let response = self.gateway.forward(request).await.map_err(|err| {
            error!(instance_id, error = %err, "instance_status: backend probe failed");
            PipelineError::from(err)
        })?;

        let mut connectivity = InstanceStatus::from_str(&instance.status);

        let report = if response.is_success() {
            extract_backend_status(response.json())
        } else {
            None
        };

        match report {
            Some(report) => {
                let refreshed = InstanceStatus::from_backend_report(&report.state);
                let phone_number = match refreshed {
                    InstanceStatus::Connected => {
                        report.phone_number.or_else(|| instance.phone_number.clone())
                    }
                    InstanceStatus::Connecting => instance.phone_number.clone(),
                    _ => None,
                };

                self.instance_repo
                    .update_connectivity(instance.id, refreshed, phone_number)
                    .await
                    .map_err(|err| {
                        error!(
                            instance_id,
                            db_error = ?err,
                            "instance_status: failed to persist connectivity"
                        );
                        PipelineError::Internal(err)
                    })?;

                connectivity = refreshed;
                info!(
                    instance_id,
                    connectivity = %refreshed,
                    "instance_status: connectivity refreshed"
                );
            }
            None => {
                debug!(
                    instance_id,
                    status = response.status,
                    "instance_status: backend reported no usable status"
                );
            }
        }

        Ok(StatusReport {
            status: response.status,
            body: response.body,
            connectivity,
        })
    }
}

struct BackendStatusReport {
    state: String,
    phone_number: Option<String>,
}

/// Status field read from `data` when present there, from the top
/// level otherwise.
fn extract_backend_status(body: Option<&Value>) -> Option<BackendStatusReport> {
    let body = body?;
    let source = match body.get("data") {
        Some(data) if data.get("status").is_some() => data,
        _ => body,
    };

    let state = source.get("status")?.as_str()?.to_string();
    let phone_number = source
        .get("phoneNumber")
        .or_else(|| source.get("phone_number"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Some(BackendStatusReport {
        state,
        phone_number,
    })
}
