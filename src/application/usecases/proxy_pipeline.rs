use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    application::{
        interfaces::automation::{AutomationGateway, ForwardError},
        usecases::{
            errors::{PipelineError, PipelineResult},
            outcome_logger::{OutcomeLogger, UsageRefs},
            ownership_resolver::OwnershipResolver,
            plan_resolver::SubscriptionPlanResolver,
            quota::QuotaCounter,
        },
    },
    domain::{
        entities::instances::InstanceEntity,
        repositories::{
            customers::CustomerRepository, instances::InstanceRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, usage_logs::UsageLogRepository,
        },
        value_objects::{
            enums::instance_statuses::InstanceStatus,
            forwarding::{ForwardRequest, ResponseBody},
            iam::RequestContext,
            operations::{Operation, PostForwardEffect},
        },
    },
};

/// Stages a request moves through, in order. Failures keep the stage
/// they happened in via the log line that reports them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineStage {
    Received,
    Authorizing,
    SubscriptionChecking,
    QuotaChecking,
    Forwarding,
    Logging,
    Completed,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            PipelineStage::Received => "received",
            PipelineStage::Authorizing => "authorizing",
            PipelineStage::SubscriptionChecking => "subscription_checking",
            PipelineStage::QuotaChecking => "quota_checking",
            PipelineStage::Forwarding => "forwarding",
            PipelineStage::Logging => "logging",
            PipelineStage::Completed => "completed",
        };
        write!(f, "{}", stage)
    }
}

/// What the handler mirrors back to the caller.
#[derive(Debug)]
pub struct ProxyOutcome {
    pub status: u16,
    pub body: ResponseBody,
    pub message_id: String,
}

/// The instance-scoped request pipeline: authorize the caller against
/// the instance, check subscription and quota, forward, append the
/// usage row, then apply any local state transition the operation
/// carries.
pub struct ProxyPipelineUseCase<C, I, S, P, L, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    L: UsageLogRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    ownership: OwnershipResolver<C, I>,
    plans: SubscriptionPlanResolver<S, P>,
    quota: QuotaCounter<L, I>,
    logger: OutcomeLogger<L>,
    instance_repo: Arc<I>,
    gateway: Arc<G>,
}

impl<C, I, S, P, L, G> ProxyPipelineUseCase<C, I, S, P, L, G>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InstanceRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    L: UsageLogRepository + Send + Sync + 'static,
    G: AutomationGateway + Send + Sync + 'static,
{
    pub fn new(
        customer_repo: Arc<C>,
        instance_repo: Arc<I>,
        subscription_repo: Arc<S>,
        plan_repo: Arc<P>,
        usage_log_repo: Arc<L>,
        gateway: Arc<G>,
        capture_payloads: bool,
    ) -> Self {
        Self {
            ownership: OwnershipResolver::new(customer_repo, Arc::clone(&instance_repo)),
            plans: SubscriptionPlanResolver::new(subscription_repo, plan_repo),
            quota: QuotaCounter::new(Arc::clone(&usage_log_repo), Arc::clone(&instance_repo)),
            logger: OutcomeLogger::new(usage_log_repo, capture_payloads),
            instance_repo,
            gateway,
        }
    }

    pub async fn execute(
        &self,
        ctx: RequestContext,
        operation: &'static Operation,
        instance_id: &str,
        request: ForwardRequest,
    ) -> PipelineResult<ProxyOutcome> {
        self.enter(PipelineStage::Received, ctx, operation, instance_id);

        self.enter(PipelineStage::Authorizing, ctx, operation, instance_id);
        let (customer, instance) = self
            .ownership
            .resolve_owned_instance(ctx, instance_id)
            .await?;

        self.enter(PipelineStage::SubscriptionChecking, ctx, operation, instance_id);
        let (subscription, plan) = self.plans.resolve_for_instance(&instance).await?;

        self.enter(PipelineStage::QuotaChecking, ctx, operation, instance_id);
        self.quota.ensure_message_quota(&subscription, &plan).await?;

        let refs = UsageRefs {
            instance_id: Some(instance.id),
            customer_id: customer.id,
            subscription_id: subscription.id,
        };
        let request_payload = request.payload.clone();

        self.enter(PipelineStage::Forwarding, ctx, operation, instance_id);
        let response = match self.gateway.forward(request).await {
            Ok(response) => response,
            Err(ForwardError::Unavailable(detail)) => {
                error!(
                    operation = operation.name,
                    instance_id,
                    detail,
                    "pipeline: automation backend unreachable"
                );
                self.enter(PipelineStage::Logging, ctx, operation, instance_id);
                self.logger
                    .record_unavailable(&refs, &request_payload, &detail)
                    .await?;
                return Err(PipelineError::BackendUnavailable(detail));
            }
            Err(ForwardError::Internal(err)) => {
                error!(
                    operation = operation.name,
                    instance_id,
                    error = ?err,
                    "pipeline: failed to build the forwarded request"
                );
                return Err(PipelineError::Internal(err));
            }
        };

        self.enter(PipelineStage::Logging, ctx, operation, instance_id);
        let message_id = self
            .logger
            .record_delivery(&refs, &request_payload, &response)
            .await?;

        if response.is_success() {
            self.apply_post_effect(operation, &instance).await?;
        }

        self.enter(PipelineStage::Completed, ctx, operation, instance_id);
        info!(
            operation = operation.name,
            instance_id,
            %message_id,
            status = response.status,
            "pipeline: request completed"
        );

        Ok(ProxyOutcome {
            status: response.status,
            body: response.body,
            message_id,
        })
    }

    async fn apply_post_effect(
        &self,
        operation: &Operation,
        instance: &InstanceEntity,
    ) -> PipelineResult<()> {
        let Some(effect) = operation.post_effect else {
            return Ok(());
        };

        match effect {
            PostForwardEffect::MarkDeleted => {
                info!(
                    instance_id = %instance.instance_id,
                    "pipeline: marking instance deleted"
                );
                self.instance_repo
                    .update_status(instance.id, InstanceStatus::Deleted)
                    .await
            }
            PostForwardEffect::MarkLoggedOut => {
                info!(
                    instance_id = %instance.instance_id,
                    "pipeline: marking instance logged out"
                );
                self.instance_repo
                    .update_connectivity(instance.id, InstanceStatus::Disconnected, None)
                    .await
            }
        }
        .map_err(|err| {
            error!(
                instance_id = %instance.instance_id,
                db_error = ?err,
                "pipeline: failed to apply post-forward state"
            );
            PipelineError::Internal(err)
        })
    }

    fn enter(
        &self,
        stage: PipelineStage,
        ctx: RequestContext,
        operation: &Operation,
        instance_id: &str,
    ) {
        debug!(
            stage = %stage,
            user_id = %ctx.user_id,
            operation = operation.name,
            instance_id,
            "pipeline: entering stage"
        );
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::{
        application::interfaces::automation::MockAutomationGateway,
        domain::{
            entities::{
                customers::CustomerEntity, plans::PlanEntity, subscriptions::SubscriptionEntity,
            },
            repositories::{
                customers::MockCustomerRepository, instances::MockInstanceRepository,
                plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
                usage_logs::MockUsageLogRepository,
            },
            value_objects::{
                enums::{
                    delivery_statuses::DeliveryStatus,
                    subscription_statuses::SubscriptionStatus,
                },
                forwarding::ForwardResponse,
                operations::CATALOG,
                payloads::ResolvedPayload,
            },
        },
    };

    fn operation(name: &str) -> &'static Operation {
        CATALOG
            .iter()
            .find(|operation| operation.name == name)
            .unwrap()
    }

    fn sample_customer(user_id: Uuid) -> CustomerEntity {
        CustomerEntity {
            id: Uuid::new_v4(),
            user_id,
            customer_name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn sample_instance(customer_id: Uuid, subscription_id: Uuid) -> InstanceEntity {
        let now = Utc::now();
        InstanceEntity {
            id: Uuid::new_v4(),
            instance_id: "wa-main".to_string(),
            customer_id,
            subscription_id: Some(subscription_id),
            status: InstanceStatus::Connected.to_string(),
            phone_number: Some("15550001111".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_subscription(customer_id: Uuid, plan_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            customer_id,
            plan_id,
            starts_at: now - Duration::days(3),
            ends_at: now + Duration::days(27),
            status: SubscriptionStatus::Active.to_string(),
            created_at: now - Duration::days(3),
        }
    }

    fn sample_plan(plan_id: Uuid) -> PlanEntity {
        PlanEntity {
            id: plan_id,
            name: Some("Growth".to_string()),
            max_messages_per_month: 100,
            max_instances: 3,
            is_active: true,
        }
    }

    fn send_text_request() -> ForwardRequest {
        let mut payload = ResolvedPayload::default();
        payload
            .fields
            .insert("to".to_string(), json!("15559998888"));
        payload.fields.insert("message".to_string(), json!("hi"));
        ForwardRequest::new(
            Method::POST,
            "instance/wa-main/send/text".to_string(),
            payload,
        )
    }

    struct Mocks {
        customer_repo: MockCustomerRepository,
        instance_repo: MockInstanceRepository,
        subscription_repo: MockSubscriptionRepository,
        plan_repo: MockPlanRepository,
        usage_log_repo: MockUsageLogRepository,
        gateway: MockAutomationGateway,
    }

    struct Fixture {
        user_id: Uuid,
        instance: InstanceEntity,
        subscription: SubscriptionEntity,
    }

    /// Wires the lookups every scenario shares: caller has an account,
    /// the instance is theirs and bound to an active subscription.
    fn authorized_mocks() -> (Mocks, Fixture) {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let customer = sample_customer(user_id);
        let subscription = sample_subscription(customer.id, plan_id);
        let instance = sample_instance(customer.id, subscription.id);
        let plan = sample_plan(plan_id);

        let mut customer_repo = MockCustomerRepository::new();
        let mut instance_repo = MockInstanceRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut plan_repo = MockPlanRepository::new();

        let found_customer = customer.clone();
        customer_repo
            .expect_find_by_user_id()
            .with(eq(user_id))
            .returning(move |_| {
                let customer = found_customer.clone();
                Box::pin(async move { Ok(Some(customer)) })
            });

        let found_instance = instance.clone();
        instance_repo
            .expect_find_by_instance_id()
            .with(eq("wa-main".to_string()))
            .returning(move |_| {
                let instance = found_instance.clone();
                Box::pin(async move { Ok(Some(instance)) })
            });

        let found_subscription = subscription.clone();
        subscription_repo
            .expect_find_by_id()
            .with(eq(subscription.id))
            .returning(move |_| {
                let subscription = found_subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });

        plan_repo
            .expect_find_by_id()
            .with(eq(plan_id))
            .returning(move |_| {
                let plan = plan.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });

        let mocks = Mocks {
            customer_repo,
            instance_repo,
            subscription_repo,
            plan_repo,
            usage_log_repo: MockUsageLogRepository::new(),
            gateway: MockAutomationGateway::new(),
        };
        let fixture = Fixture {
            user_id,
            instance,
            subscription,
        };
        (mocks, fixture)
    }

    fn build(
        mocks: Mocks,
    ) -> ProxyPipelineUseCase<
        MockCustomerRepository,
        MockInstanceRepository,
        MockSubscriptionRepository,
        MockPlanRepository,
        MockUsageLogRepository,
        MockAutomationGateway,
    > {
        ProxyPipelineUseCase::new(
            Arc::new(mocks.customer_repo),
            Arc::new(mocks.instance_repo),
            Arc::new(mocks.subscription_repo),
            Arc::new(mocks.plan_repo),
            Arc::new(mocks.usage_log_repo),
            Arc::new(mocks.gateway),
            false,
        )
    }

    fn expect_usage(mocks: &mut Mocks, count: i64) {
        mocks
            .usage_log_repo
            .expect_count_by_subscription_between()
            .returning(move |_, _, _| Box::pin(async move { Ok(count) }));
    }

    #[tokio::test]
    async fn a_clean_request_mirrors_the_backend_response() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 5);

        mocks.gateway.expect_forward().returning(|_| {
            Ok(ForwardResponse {
                status: 200,
                body: ResponseBody::Json(json!({ "key": { "id": "WAKEY1" } })),
            })
        });

        let instance_pk = fixture.instance.id;
        let subscription_id = fixture.subscription.id;
        mocks
            .usage_log_repo
            .expect_insert()
            .withf(move |entity| {
                entity.status == DeliveryStatus::Sent.to_string()
                    && entity.message_id == "WAKEY1"
                    && entity.instance_id == Some(instance_pk)
                    && entity.subscription_id == subscription_id
            })
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        mocks.instance_repo.expect_update_status().never();
        mocks.instance_repo.expect_update_connectivity().never();

        let pipeline = build(mocks);

        let outcome = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("send_text"),
                "wa-main",
                send_text_request(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.message_id, "WAKEY1");
    }

    #[tokio::test]
    async fn exhausted_quota_stops_the_request_before_forwarding() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 100);

        mocks.gateway.expect_forward().never();
        mocks.usage_log_repo.expect_insert().never();

        let pipeline = build(mocks);

        let result = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("send_text"),
                "wa-main",
                send_text_request(),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn a_foreign_instance_never_reaches_the_backend() {
        let user_id = Uuid::new_v4();
        let customer = sample_customer(user_id);
        let foreign_instance = sample_instance(Uuid::new_v4(), Uuid::new_v4());

        let mut mocks = Mocks {
            customer_repo: MockCustomerRepository::new(),
            instance_repo: MockInstanceRepository::new(),
            subscription_repo: MockSubscriptionRepository::new(),
            plan_repo: MockPlanRepository::new(),
            usage_log_repo: MockUsageLogRepository::new(),
            gateway: MockAutomationGateway::new(),
        };

        mocks
            .customer_repo
            .expect_find_by_user_id()
            .returning(move |_| {
                let customer = customer.clone();
                Box::pin(async move { Ok(Some(customer)) })
            });
        mocks
            .instance_repo
            .expect_find_by_instance_id()
            .returning(move |_| {
                let instance = foreign_instance.clone();
                Box::pin(async move { Ok(Some(instance)) })
            });
        mocks.subscription_repo.expect_find_by_id().never();
        mocks.gateway.expect_forward().never();
        mocks.usage_log_repo.expect_insert().never();

        let pipeline = build(mocks);

        let result = pipeline
            .execute(
                RequestContext::new(user_id),
                operation("send_text"),
                "wa-main",
                send_text_request(),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::Forbidden)));
    }

    #[tokio::test]
    async fn an_unreachable_backend_still_leaves_an_audit_row() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 5);

        mocks
            .gateway
            .expect_forward()
            .returning(|_| Err(ForwardError::Unavailable("connection refused".to_string())));

        let instance_pk = fixture.instance.id;
        mocks
            .usage_log_repo
            .expect_insert()
            .withf(move |entity| {
                entity.status == DeliveryStatus::Failed.to_string()
                    && entity.message_id.starts_with("LOG-")
                    && entity.instance_id == Some(instance_pk)
            })
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let pipeline = build(mocks);

        let result = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("send_text"),
                "wa-main",
                send_text_request(),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn an_inactive_subscription_is_rejected_before_quota() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let customer = sample_customer(user_id);
        let mut subscription = sample_subscription(customer.id, plan_id);
        subscription.status = SubscriptionStatus::Expired.to_string();
        let instance = sample_instance(customer.id, subscription.id);

        let mut mocks = Mocks {
            customer_repo: MockCustomerRepository::new(),
            instance_repo: MockInstanceRepository::new(),
            subscription_repo: MockSubscriptionRepository::new(),
            plan_repo: MockPlanRepository::new(),
            usage_log_repo: MockUsageLogRepository::new(),
            gateway: MockAutomationGateway::new(),
        };

        mocks
            .customer_repo
            .expect_find_by_user_id()
            .returning(move |_| {
                let customer = customer.clone();
                Box::pin(async move { Ok(Some(customer)) })
            });
        mocks
            .instance_repo
            .expect_find_by_instance_id()
            .returning(move |_| {
                let instance = instance.clone();
                Box::pin(async move { Ok(Some(instance)) })
            });
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });
        mocks
            .usage_log_repo
            .expect_count_by_subscription_between()
            .never();
        mocks.gateway.expect_forward().never();

        let pipeline = build(mocks);

        let result = pipeline
            .execute(
                RequestContext::new(user_id),
                operation("send_text"),
                "wa-main",
                send_text_request(),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::SubscriptionInactive)));
    }

    #[tokio::test]
    async fn a_confirmed_deletion_marks_the_instance_deleted() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 5);

        mocks.gateway.expect_forward().returning(|_| {
            Ok(ForwardResponse {
                status: 200,
                body: ResponseBody::Json(json!({ "success": true })),
            })
        });
        mocks
            .usage_log_repo
            .expect_insert()
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        mocks
            .instance_repo
            .expect_update_status()
            .with(eq(fixture.instance.id), eq(InstanceStatus::Deleted))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let pipeline = build(mocks);

        let outcome = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("instance_delete"),
                "wa-main",
                ForwardRequest::new(
                    Method::DELETE,
                    "instance/wa-main".to_string(),
                    ResolvedPayload::default(),
                ),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn a_rejected_deletion_keeps_the_instance() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 5);

        mocks.gateway.expect_forward().returning(|_| {
            Ok(ForwardResponse {
                status: 500,
                body: ResponseBody::Json(json!({ "error": "session busy" })),
            })
        });
        mocks
            .usage_log_repo
            .expect_insert()
            .withf(|entity| entity.status == DeliveryStatus::Failed.to_string())
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        mocks.instance_repo.expect_update_status().never();

        let pipeline = build(mocks);

        let outcome = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("instance_delete"),
                "wa-main",
                ForwardRequest::new(
                    Method::DELETE,
                    "instance/wa-main".to_string(),
                    ResolvedPayload::default(),
                ),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, 500);
    }

    #[tokio::test]
    async fn a_confirmed_logout_clears_the_connection() {
        let (mut mocks, fixture) = authorized_mocks();
        expect_usage(&mut mocks, 5);

        mocks.gateway.expect_forward().returning(|_| {
            Ok(ForwardResponse {
                status: 200,
                body: ResponseBody::Json(json!({ "success": true })),
            })
        });
        mocks
            .usage_log_repo
            .expect_insert()
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        mocks
            .instance_repo
            .expect_update_connectivity()
            .with(
                eq(fixture.instance.id),
                eq(InstanceStatus::Disconnected),
                eq(None),
            )
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let pipeline = build(mocks);

        let outcome = pipeline
            .execute(
                RequestContext::new(fixture.user_id),
                operation("instance_logout"),
                "wa-main",
                ForwardRequest::new(
                    Method::POST,
                    "instance/wa-main/logout".to_string(),
                    ResolvedPayload::default(),
                ),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
    }
}
