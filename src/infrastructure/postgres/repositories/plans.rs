use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{entities::plans::PlanEntity, repositories::plans::PlanRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::plans},
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    /// Deactivated plans still resolve; an existing subscription keeps
    /// the limits it was sold with.
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = plans::table
            .filter(plans::id.eq(plan_id))
            .select(PlanEntity::as_select())
            .first::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
