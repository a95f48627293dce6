use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use chrono::{DateTime, Utc};
use diesel::{insert_into, prelude::*};
use uuid::Uuid;

use crate::{
    domain::{
        entities::usage_logs::InsertUsageLogEntity,
        repositories::usage_logs::UsageLogRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::usage_logs},
};

pub struct UsageLogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UsageLogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UsageLogRepository for UsageLogPostgres {
    async fn insert(&self, insert_usage_log_entity: InsertUsageLogEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(usage_logs::table)
            .values(&insert_usage_log_entity)
            .returning(usage_logs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn count_by_subscription_between(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = usage_logs::table
            .filter(usage_logs::subscription_id.eq(subscription_id))
            .filter(usage_logs::created_at.ge(from))
            .filter(usage_logs::created_at.lt(until))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }
}
