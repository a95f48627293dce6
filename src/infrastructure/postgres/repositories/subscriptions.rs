use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::subscriptions::SubscriptionRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    /// Status filtering happens in the use case so an expired
    /// subscription is reported as inactive instead of missing.
    async fn find_current_by_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::customer_id.eq(customer_id))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
