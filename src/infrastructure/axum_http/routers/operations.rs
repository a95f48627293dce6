use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{MethodRouter, delete, get, post, put},
};

use crate::{
    application::{
        interfaces::automation::AutomationGateway,
        usecases::{
            errors::PipelineError, instance_provisioning::InstanceProvisioningUseCase,
            instance_status::InstanceStatusUseCase, payload_resolver,
            proxy_pipeline::ProxyPipelineUseCase,
        },
    },
    auth::AuthUser,
    domain::value_objects::{
        forwarding::ForwardRequest,
        operations::{CATALOG, Operation, OperationKind},
    },
    infrastructure::{
        automation_http::client::AutomationClient,
        axum_http::{error_responses::mirrored_response, extractors::RawOperationRequest},
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                customers::CustomerPostgres, instances::InstancePostgres, plans::PlanPostgres,
                subscriptions::SubscriptionPostgres, usage_logs::UsageLogPostgres,
            },
        },
    },
};

pub type PgProxyPipeline = ProxyPipelineUseCase<
    CustomerPostgres,
    InstancePostgres,
    SubscriptionPostgres,
    PlanPostgres,
    UsageLogPostgres,
    AutomationClient,
>;

pub type PgInstanceProvisioning = InstanceProvisioningUseCase<
    CustomerPostgres,
    InstancePostgres,
    SubscriptionPostgres,
    PlanPostgres,
    UsageLogPostgres,
    AutomationClient,
>;

pub type PgInstanceStatus =
    InstanceStatusUseCase<CustomerPostgres, InstancePostgres, AutomationClient>;

pub struct OperationsState {
    pub pipeline: Arc<PgProxyPipeline>,
    pub provisioning: Arc<PgInstanceProvisioning>,
    pub status: Arc<PgInstanceStatus>,
    pub gateway: Arc<AutomationClient>,
}

pub fn proxy_pipeline(
    db_pool: &Arc<PgPoolSquad>,
    automation_client: &Arc<AutomationClient>,
    capture_payloads: bool,
) -> PgProxyPipeline {
    ProxyPipelineUseCase::new(
        Arc::new(CustomerPostgres::new(Arc::clone(db_pool))),
        Arc::new(InstancePostgres::new(Arc::clone(db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(db_pool))),
        Arc::new(PlanPostgres::new(Arc::clone(db_pool))),
        Arc::new(UsageLogPostgres::new(Arc::clone(db_pool))),
        Arc::clone(automation_client),
        capture_payloads,
    )
}

/// Registers one route per catalog entry. Entries sharing a path are
/// merged into a single method router, each method carrying its own
/// operation extension.
pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    automation_client: Arc<AutomationClient>,
    capture_payloads: bool,
) -> Router {
    let pipeline = Arc::new(proxy_pipeline(&db_pool, &automation_client, capture_payloads));
    let provisioning = Arc::new(InstanceProvisioningUseCase::new(
        Arc::new(CustomerPostgres::new(Arc::clone(&db_pool))),
        Arc::new(InstancePostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(UsageLogPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&automation_client),
        capture_payloads,
    ));
    let status = Arc::new(InstanceStatusUseCase::new(
        Arc::new(CustomerPostgres::new(Arc::clone(&db_pool))),
        Arc::new(InstancePostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&automation_client),
    ));

    let state = Arc::new(OperationsState {
        pipeline,
        provisioning,
        status,
        gateway: automation_client,
    });

    let mut router = Router::new();
    for operation in CATALOG {
        router = router.route(
            operation.route,
            method_router(operation).layer(Extension(operation)),
        );
    }

    router.with_state(state)
}

fn method_router(operation: &'static Operation) -> MethodRouter<Arc<OperationsState>> {
    match operation.kind {
        OperationKind::AccountProvisioning => post(create_instance),
        OperationKind::AccountPassthrough => get(forward_account_read),
        OperationKind::StatusRefresh => get(refresh_instance_status),
        OperationKind::InstanceScoped => match operation.method.as_str() {
            "GET" => get(dispatch_operation),
            "PUT" => put(dispatch_operation),
            "DELETE" => delete(dispatch_operation),
            _ => post(dispatch_operation),
        },
    }
}

pub async fn dispatch_operation(
    State(state): State<Arc<OperationsState>>,
    Extension(operation): Extension<&'static Operation>,
    auth: AuthUser,
    Path(params): Path<HashMap<String, String>>,
    RawOperationRequest(parts): RawOperationRequest,
) -> Response {
    let instance_id = params.get("instance_id").cloned().unwrap_or_default();
    let payload = payload_resolver::resolve(parts);

    let backend_path = match operation.render_backend_path(&params, &payload) {
        Ok(path) => path,
        Err(err) => return PipelineError::Internal(err).into_response(),
    };
    let request = ForwardRequest::new(operation.method.clone(), backend_path, payload);

    match state
        .pipeline
        .execute(auth.context(), operation, &instance_id, request)
        .await
    {
        Ok(outcome) => mirrored_response(outcome.status, outcome.body),
        Err(err) => err.into_response(),
    }
}

pub async fn create_instance(
    State(state): State<Arc<OperationsState>>,
    Extension(operation): Extension<&'static Operation>,
    auth: AuthUser,
    RawOperationRequest(parts): RawOperationRequest,
) -> Response {
    let payload = payload_resolver::resolve(parts);
    let request = ForwardRequest::new(
        operation.method.clone(),
        operation.backend_path.to_string(),
        payload,
    );

    match state.provisioning.execute(auth.context(), request).await {
        Ok(outcome) => mirrored_response(outcome.status, outcome.body),
        Err(err) => err.into_response(),
    }
}

pub async fn refresh_instance_status(
    State(state): State<Arc<OperationsState>>,
    Extension(operation): Extension<&'static Operation>,
    auth: AuthUser,
    Path(params): Path<HashMap<String, String>>,
    RawOperationRequest(parts): RawOperationRequest,
) -> Response {
    let instance_id = params.get("instance_id").cloned().unwrap_or_default();
    let payload = payload_resolver::resolve(parts);

    let backend_path = match operation.render_backend_path(&params, &payload) {
        Ok(path) => path,
        Err(err) => return PipelineError::Internal(err).into_response(),
    };
    let request = ForwardRequest::new(operation.method.clone(), backend_path, payload);

    match state.status.execute(auth.context(), &instance_id, request).await {
        Ok(report) => mirrored_response(report.status, report.body),
        Err(err) => err.into_response(),
    }
}

/// Account-level reads carry no instance: authenticated callers reach
/// the backend directly, without quota accounting or a usage row.
pub async fn forward_account_read(
    State(state): State<Arc<OperationsState>>,
    Extension(operation): Extension<&'static Operation>,
    _auth: AuthUser,
    RawOperationRequest(parts): RawOperationRequest,
) -> Response {
    let payload = payload_resolver::resolve(parts);
    let request = ForwardRequest::new(
        operation.method.clone(),
        operation.backend_path.to_string(),
        payload,
    );

    match state.gateway.forward(request).await {
        Ok(response) => mirrored_response(response.status, response.body),
        Err(err) => PipelineError::from(err).into_response(),
    }
}
