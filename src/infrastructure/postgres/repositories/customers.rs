use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{entities::customers::CustomerEntity, repositories::customers::CustomerRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::customers},
};

pub struct CustomerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CustomerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CustomerRepository for CustomerPostgres {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<CustomerEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = customers::table
            .filter(customers::user_id.eq(user_id))
            .select(CustomerEntity::as_select())
            .first::<CustomerEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
