use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{PipelineError, PipelineResult},
    domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{instances::InstanceRepository, usage_logs::UsageLogRepository},
    },
};

/// Enforces the two plan ceilings: usage rows per subscription in the
/// current calendar month, and live instances per customer.
///
/// The count and the later insert are separate statements, so two
/// requests racing on the last quota slot can both pass. The ceiling
/// is a soft limit, off by at most the number of in-flight requests.
pub struct QuotaCounter<L, I>
where
    L: UsageLogRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
{
    usage_log_repo: Arc<L>,
    instance_repo: Arc<I>,
}

impl<L, I> QuotaCounter<L, I>
where
    L: UsageLogRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
{
    pub fn new(usage_log_repo: Arc<L>, instance_repo: Arc<I>) -> Self {
        Self {
            usage_log_repo,
            instance_repo,
        }
    }

    /// Half-open UTC window `[1st of this month, 1st of next month)`.
    pub fn billing_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        // The first of a month at midnight is always a valid instant.
        let from = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        let until = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        (from, until)
    }

    pub async fn ensure_message_quota(
        &self,
        subscription: &SubscriptionEntity,
        plan: &PlanEntity,
    ) -> PipelineResult<()> {
        let (from, until) = Self::billing_window(Utc::now());

        let used = self
            .usage_log_repo
            .count_by_subscription_between(subscription.id, from, until)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "quota: failed to count monthly usage"
                );
                PipelineError::Internal(err)
            })?;

        let ceiling = i64::from(plan.max_messages_per_month);
        if used >= ceiling {
            warn!(
                subscription_id = %subscription.id,
                used,
                ceiling,
                "quota: monthly message quota exhausted"
            );
            return Err(PipelineError::QuotaExceeded);
        }

        debug!(
            subscription_id = %subscription.id,
            used,
            ceiling,
            "quota: within monthly message quota"
        );
        Ok(())
    }

    pub async fn ensure_instance_quota(
        &self,
        customer_id: Uuid,
        plan: &PlanEntity,
    ) -> PipelineResult<()> {
        let active = self
            .instance_repo
            .count_active_by_customer(customer_id)
            .await
            .map_err(|err| {
                error!(%customer_id, db_error = ?err, "quota: failed to count instances");
                PipelineError::Internal(err)
            })?;

        let ceiling = i64::from(plan.max_instances);
        if active >= ceiling {
            warn!(
                %customer_id,
                active,
                ceiling,
                "quota: plan instance limit reached"
            );
            return Err(PipelineError::InstanceLimitExceeded);
        }

        Ok(())
    }
}
