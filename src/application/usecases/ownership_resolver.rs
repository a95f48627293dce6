use std::sync::Arc;

use tracing::{error, warn};

use crate::{
    application::usecases::errors::{PipelineError, PipelineResult},
    domain::{
        entities::{customers::CustomerEntity, instances::InstanceEntity},
        repositories::{customers::CustomerRepository, instances::InstanceRepository},
        value_objects::iam::RequestContext,
    },
};

/// Maps the authenticated caller to their customer account and checks
/// that a requested instance belongs to it.
pub struct OwnershipResolver<C, I>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
{
    customer_repo: Arc<C>,
    instance_repo: Arc<I>,
}

impl<C, I> OwnershipResolver<C, I>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
{
    pub fn new(customer_repo: Arc<C>, instance_repo: Arc<I>) -> Self {
        Self {
            customer_repo,
            instance_repo,
        }
    }

    pub async fn resolve_customer(&self, ctx: RequestContext) -> PipelineResult<CustomerEntity> {
        let user_id = ctx.user_id;

        self.customer_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "ownership: failed to load customer");
                PipelineError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "ownership: no customer account for caller");
                PipelineError::CustomerNotFound
            })
    }

    pub async fn resolve_owned_instance(
        &self,
        ctx: RequestContext,
        instance_id: &str,
    ) -> PipelineResult<(CustomerEntity, InstanceEntity)> {
        let customer = self.resolve_customer(ctx).await?;

        let instance = self
            .instance_repo
            .find_by_instance_id(instance_id.to_string())
            .await
            .map_err(|err| {
                error!(instance_id, db_error = ?err, "ownership: failed to load instance");
                PipelineError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(instance_id, "ownership: instance not found");
                PipelineError::InstanceNotFound(instance_id.to_string())
            })?;

        if instance.customer_id != customer.id {
            warn!(
                instance_id,
                customer_id = %customer.id,
                owner_id = %instance.customer_id,
                "ownership: instance belongs to another account"
            );
            return Err(PipelineError::Forbidden);
        }

        Ok((customer, instance))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{
        repositories::{customers::MockCustomerRepository, instances::MockInstanceRepository},
        value_objects::enums::instance_statuses::InstanceStatus,
    };

    fn sample_customer(id: Uuid, user_id: Uuid) -> CustomerEntity {
        CustomerEntity {
            id,
            user_id,
            customer_name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn sample_instance(customer_id: Uuid, instance_id: &str) -> InstanceEntity {
        let now = Utc::now();
        InstanceEntity {
            id: Uuid::new_v4(),
            instance_id: instance_id.to_string(),
            customer_id,
            subscription_id: None,
            status: InstanceStatus::Connected.to_string(),
            phone_number: Some("15550001111".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn resolves_an_instance_owned_by_the_caller() {
        let user_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();

        let mut customer_repo = MockCustomerRepository::new();
        let mut instance_repo = MockInstanceRepository::new();

        let customer = sample_customer(customer_id, user_id);
        let instance = sample_instance(customer_id, "wa-main");

        customer_repo
            .expect_find_by_user_id()
            .with(eq(user_id))
            .returning(move |_| {
                let customer = customer.clone();
                Box::pin(async move { Ok(Some(customer)) })
            });
        instance_repo
            .expect_find_by_instance_id()
            .with(eq("wa-main".to_string()))
            .returning(move |_| {
                let instance = instance.clone();
                Box::pin(async move { Ok(Some(instance)) })
            });

        let resolver = OwnershipResolver::new(Arc::new(customer_repo), Arc::new(instance_repo));

        let (customer, instance) = resolver
            .resolve_owned_instance(RequestContext::new(user_id), "wa-main")
            .await
            .unwrap();

        assert_eq!(customer.id, customer_id);
        assert_eq!(instance.instance_id, "wa-main");
    }

    #[tokio::test]
    async fn rejects_callers_without_a_customer_account() {
        let user_id = Uuid::new_v4();

        let mut customer_repo = MockCustomerRepository::new();
        let mut instance_repo = MockInstanceRepository::new();

        customer_repo
            .expect_find_by_user_id()
            .with(eq(user_id))
            .returning(|_| Box::pin(async { Ok(None) }));
        instance_repo.expect_find_by_instance_id().never();

        let resolver = OwnershipResolver::new(Arc::new(customer_repo), Arc::new(instance_repo));

        let result = resolver
            .resolve_owned_instance(RequestContext::new(user_id), "wa-main")
            .await;

        assert!(matches!(result, Err(PipelineError::CustomerNotFound)));
    }

    #[tokio::test]
    async fn reports_unknown_instances_as_not_found() {
        let user_id = Uuid::new_v4();
        let customer = sample_customer(Uuid::new_v4(), user_id);

        let mut customer_repo = MockCustomerRepository::new();
        let mut instance_repo = MockInstanceRepository::new();

        customer_repo.expect_find_by_user_id().returning(move |_| {
            let customer = customer.clone();
            Box::pin(async move { Ok(Some(customer)) })
        });
        instance_repo
            .expect_find_by_instance_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let resolver = OwnershipResolver::new(Arc::new(customer_repo), Arc::new(instance_repo));

        let result = resolver
            .resolve_owned_instance(RequestContext::new(user_id), "wa-ghost")
            .await;

        assert!(matches!(result, Err(PipelineError::InstanceNotFound(id)) if id == "wa-ghost"));
    }

    #[tokio::test]
    async fn refuses_instances_owned_by_another_account() {
        let user_id = Uuid::new_v4();
        let customer = sample_customer(Uuid::new_v4(), user_id);
        let foreign_instance = sample_instance(Uuid::new_v4(), "wa-other");

        let mut customer_repo = MockCustomerRepository::new();
        let mut instance_repo = MockInstanceRepository::new();

        customer_repo.expect_find_by_user_id().returning(move |_| {
            let customer = customer.clone();
            Box::pin(async move { Ok(Some(customer)) })
        });
        instance_repo
            .expect_find_by_instance_id()
            .returning(move |_| {
                let instance = foreign_instance.clone();
                Box::pin(async move { Ok(Some(instance)) })
            });

        let resolver = OwnershipResolver::new(Arc::new(customer_repo), Arc::new(instance_repo));

        let result = resolver
            .resolve_owned_instance(RequestContext::new(user_id), "wa-other")
            .await;

        assert!(matches!(result, Err(PipelineError::Forbidden)));
    }
}
