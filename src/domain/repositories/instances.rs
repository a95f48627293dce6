use anyhow::Result;
use axum::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::instances::{InsertInstanceEntity, InstanceEntity},
    value_objects::enums::instance_statuses::InstanceStatus,
};

#[async_trait]
#[automock]
pub trait InstanceRepository {
    /// Lookup by the backend-assigned identifier. Deleted instances
    /// are filtered out here so no caller resurrects them.
    async fn find_by_instance_id(&self, instance_id: String) -> Result<Option<InstanceEntity>>;
    async fn count_active_by_customer(&self, customer_id: Uuid) -> Result<i64>;
    async fn insert(&self, insert_instance_entity: InsertInstanceEntity) -> Result<Uuid>;
    async fn update_status(&self, id: Uuid, status: InstanceStatus) -> Result<()>;
    async fn update_connectivity(
        &self,
        id: Uuid,
        status: InstanceStatus,
        phone_number: Option<String>,
    ) -> Result<()>;
}
