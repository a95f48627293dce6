use anyhow::Result;
use axum::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;
    /// Most recent subscription for a customer, used by account-scoped
    /// operations that run before any instance exists.
    async fn find_current_by_customer(&self, customer_id: Uuid)
    -> Result<Option<SubscriptionEntity>>;
}
