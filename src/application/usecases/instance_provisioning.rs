use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    application::{
        interfaces::automation::{AutomationGateway, ForwardError},
        usecases::{
            errors::{PipelineError, PipelineResult},
            outcome_logger::{OutcomeLogger, UsageRefs},
            ownership_resolver::OwnershipResolver,
            plan_resolver::SubscriptionPlanResolver,
            proxy_pipeline::ProxyOutcome,
            quota::QuotaCounter,
        },
    },
    domain::{
        entities::instances::InsertInstanceEntity,
        repositories::{
            customers::CustomerRepository, instances::InstanceRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, usage_logs::UsageLogRepository,
        },
        value_objects::{
            enums::instance_statuses::InstanceStatus, forwarding::ForwardRequest,
            iam::RequestContext,
        },
    },
};

/// Creates a messaging instance: the backend allocates the session,
/// then a local row is registered under the caller's account. The
/// instance ceiling of the plan is enforced before the backend is
/// asked for anything.
pub struct InstanceProvisioningUseCase<C, I, S, P, L, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    L: UsageLogRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    ownership: OwnershipResolver<C, I>,
    plans: SubscriptionPlanResolver<S, P>,
    quota: QuotaCounter<L, I>,
    logger: OutcomeLogger<L>,
    instance_repo: Arc<I>,
    gateway: Arc<G>,
}

impl<C, I, S, P, L, G> InstanceProvisioningUseCase<C, I, S, P, L, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    L: UsageLogRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    pub fn new(
        customer_repo: Arc<C>,
        instance_repo: Arc<I>,
        subscription_repo: Arc<S>,
        plan_repo: Arc<P>,
        usage_log_repo: Arc<L>,
        gateway: Arc<G>,
        capture_payloads: bool,
    ) -> Self {
        Self {
            ownership: OwnershipResolver::new(customer_repo, Arc::clone(&instance_repo)),
            plans: SubscriptionPlanResolver::new(subscription_repo, plan_repo),
            quota: QuotaCounter::new(Arc::clone(&usage_log_repo), Arc::clone(&instance_repo)),
            logger: OutcomeLogger::new(usage_log_repo, capture_payloads),
            instance_repo,
            gateway,
        }
    }

    pub async fn execute(
        &self,
        ctx: RequestContext,
        request: ForwardRequest,
    ) -> PipelineResult<ProxyOutcome> {
        let customer = self.ownership.resolve_customer(ctx).await?;
        let (subscription, plan) = self.plans.resolve_for_customer(customer.id).await?;
        self.quota.ensure_instance_quota(customer.id, &plan).await?;

        let request_payload = request.payload.clone();

        let response = match self.gateway.forward(request).await {
            Ok(response) => response,
            Err(ForwardError::Unavailable(detail)) => {
                error!(
                    customer_id = %customer.id,
                    detail,
                    "provisioning: automation backend unreachable"
                );
                let refs = UsageRefs {
                    instance_id: None,
                    customer_id: customer.id,
                    subscription_id: subscription.id,
                };
                self.logger
                    .record_unavailable(&refs, &request_payload, &detail)
                    .await?;
                return Err(PipelineError::BackendUnavailable(detail));
            }
            Err(ForwardError::Internal(err)) => return Err(PipelineError::Internal(err)),
        };

        if !response.is_success() {
            warn!(
                customer_id = %customer.id,
                status = response.status,
                "provisioning: backend rejected instance creation"
            );
            let refs = UsageRefs {
                instance_id: None,
                customer_id: customer.id,
                subscription_id: subscription.id,
            };
            let message_id = self
                .logger
                .record_delivery(&refs, &request_payload, &response)
                .await?;
            return Ok(ProxyOutcome {
                status: response.status,
                body: response.body,
                message_id,
            });
        }

        let inserted = match extract_backend_instance_id(response.json()) {
            Some(backend_id) => {
                let now = Utc::now();
                self.instance_repo
                    .insert(InsertInstanceEntity {
                        instance_id: backend_id.clone(),
                        customer_id: customer.id,
                        subscription_id: Some(subscription.id),
                        status: InstanceStatus::Connecting.to_string(),
                        phone_number: None,
                        created_at: now,
                        updated_at: now,
                    })
                    .await
                    .map_err(|err| {
                        error!(
                            customer_id = %customer.id,
                            backend_id,
                            db_error = ?err,
                            "provisioning: failed to register instance"
                        );
                        PipelineError::Internal(err)
                    })
            }
            None => {
                error!(
                    customer_id = %customer.id,
                    "provisioning: backend confirmed creation but returned no instance id"
                );
                Err(PipelineError::Internal(anyhow!(
                    "create response carried no instance id"
                )))
            }
        };

        // The attempt is recorded even when local registration failed;
        // the backend session exists either way.
        let refs = UsageRefs {
            instance_id: inserted.as_ref().ok().copied(),
            customer_id: customer.id,
            subscription_id: subscription.id,
        };
        let message_id = self
            .logger
            .record_delivery(&refs, &request_payload, &response)
            .await?;

        let instance_pk = inserted?;
        info!(
            customer_id = %customer.id,
            %instance_pk,
            %message_id,
            "provisioning: instance registered"
        );

        Ok(ProxyOutcome {
            status: response.status,
            body: response.body,
            message_id,
        })
    }
}

/// The backend names the new session `instanceId` (or `instance_id`),
/// either at the top level or under `data`.
fn extract_backend_instance_id(body: Option<&Value>) -> Option<String> {
    let body = body?;
    let candidates = [
        body.get("instanceId"),
        body.get("instance_id"),
        body.pointer("/data/instanceId"),
        body.pointer("/data/instance_id"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            _ => None,
        })
}
