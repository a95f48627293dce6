use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{PipelineError, PipelineResult},
    domain::{
        entities::{instances::InstanceEntity, plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    },
};

/// Resolves the subscription that covers a request and the plan whose
/// ceilings apply to it. Instance-scoped traffic uses the subscription
/// the instance is bound to; account-scoped operations use the
/// customer's most recent one.
pub struct SubscriptionPlanResolver<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
}

impl<S, P> SubscriptionPlanResolver<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, plan_repo: Arc<P>) -> Self {
        Self {
            subscription_repo,
            plan_repo,
        }
    }

    pub async fn resolve_for_instance(
        &self,
        instance: &InstanceEntity,
    ) -> PipelineResult<(SubscriptionEntity, PlanEntity)> {
        let subscription_id = instance.subscription_id.ok_or_else(|| {
            warn!(
                instance_id = %instance.instance_id,
                "plan_resolver: instance is not bound to a subscription"
            );
            PipelineError::SubscriptionNotFound
        })?;

        debug!(
            instance_id = %instance.instance_id,
            %subscription_id,
            "plan_resolver: using subscription bound to instance"
        );

        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "plan_resolver: failed to load subscription");
                PipelineError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(
                    instance_id = %instance.instance_id,
                    %subscription_id,
                    "plan_resolver: bound subscription does not exist"
                );
                PipelineError::SubscriptionNotFound
            })?;

        self.ensure_covered(subscription).await
    }

    pub async fn resolve_for_customer(
        &self,
        customer_id: Uuid,
    ) -> PipelineResult<(SubscriptionEntity, PlanEntity)> {
        let subscription = self.current_for_customer(customer_id).await?;
        self.ensure_covered(subscription).await
    }

    async fn current_for_customer(
        &self,
        customer_id: Uuid,
    ) -> PipelineResult<SubscriptionEntity> {
        self.subscription_repo
            .find_current_by_customer(customer_id)
            .await
            .map_err(|err| {
                error!(%customer_id, db_error = ?err, "plan_resolver: failed to load current subscription");
                PipelineError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%customer_id, "plan_resolver: customer has no subscription");
                PipelineError::SubscriptionNotFound
            })
    }

    async fn ensure_covered(
        &self,
        subscription: SubscriptionEntity,
    ) -> PipelineResult<(SubscriptionEntity, PlanEntity)> {
        let status = SubscriptionStatus::from_str(&subscription.status);
        let now = Utc::now();

        if status != SubscriptionStatus::Active
            || now < subscription.starts_at
            || now >= subscription.ends_at
        {
            warn!(
                subscription_id = %subscription.id,
                status = %subscription.status,
                ends_at = %subscription.ends_at,
                "plan_resolver: subscription does not cover this request"
            );
            return Err(PipelineError::SubscriptionInactive);
        }

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(plan_id = %subscription.plan_id, db_error = ?err, "plan_resolver: failed to load plan");
                PipelineError::Internal(err)
            })?
            .ok_or_else(|| {
                error!(
                    subscription_id = %subscription.id,
                    plan_id = %subscription.plan_id,
                    "plan_resolver: subscription references a missing plan"
                );
                PipelineError::Internal(anyhow!(
                    "plan {} not found for subscription {}",
                    subscription.plan_id,
                    subscription.id
                ))
            })?;

        Ok((subscription, plan))
    }
}
