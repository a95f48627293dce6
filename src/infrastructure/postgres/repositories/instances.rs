use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::instances::{InsertInstanceEntity, InstanceEntity},
        repositories::instances::InstanceRepository,
        value_objects::enums::instance_statuses::InstanceStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::instances},
};

pub struct InstancePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InstancePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InstanceRepository for InstancePostgres {
    async fn find_by_instance_id(&self, instance_id: String) -> Result<Option<InstanceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = instances::table
            .filter(instances::instance_id.eq(instance_id))
            .filter(instances::status.ne(InstanceStatus::Deleted.to_string()))
            .select(InstanceEntity::as_select())
            .first::<InstanceEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn count_active_by_customer(&self, customer_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = instances::table
            .filter(instances::customer_id.eq(customer_id))
            .filter(instances::status.ne(InstanceStatus::Deleted.to_string()))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }

    async fn insert(&self, insert_instance_entity: InsertInstanceEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(instances::table)
            .values(&insert_instance_entity)
            .returning(instances::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn update_status(&self, id: Uuid, status: InstanceStatus) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(instances::table)
            .filter(instances::id.eq(id))
            .set((
                instances::status.eq(status.to_string()),
                instances::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_connectivity(
        &self,
        id: Uuid,
        status: InstanceStatus,
        phone_number: Option<String>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(instances::table)
            .filter(instances::id.eq(id))
            .set((
                instances::status.eq(status.to_string()),
                instances::phone_number.eq(phone_number),
                instances::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
