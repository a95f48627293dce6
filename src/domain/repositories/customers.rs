use anyhow::Result;
use axum::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::customers::CustomerEntity;

#[async_trait]
#[automock]
pub trait CustomerRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<CustomerEntity>>;
}
