use anyhow::Result;
use axum::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::usage_logs::InsertUsageLogEntity;

#[async_trait]
#[automock]
pub trait UsageLogRepository {
    async fn insert(&self, insert_usage_log_entity: InsertUsageLogEntity) -> Result<Uuid>;
    /// Rows counted in `[from, until)` regardless of delivery status.
    async fn count_by_subscription_between(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64>;
}
