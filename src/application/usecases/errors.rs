use axum::http::StatusCode;
use thiserror::Error;

use crate::application::interfaces::automation::ForwardError;

/// Everything that can stop a request on its way through the gateway.
/// Authentication failures never reach this type; the extractor
/// rejects them before any use case runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no customer account for the authenticated caller")]
    CustomerNotFound,
    #[error("instance not found: {0}")]
    InstanceNotFound(String),
    #[error("instance belongs to another account")]
    Forbidden,
    #[error("no subscription found for this account")]
    SubscriptionNotFound,
    #[error("subscription is not active")]
    SubscriptionInactive,
    #[error("monthly message quota exhausted")]
    QuotaExceeded,
    #[error("plan instance limit reached")]
    InstanceLimitExceeded,
    #[error("automation backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::CustomerNotFound
            | PipelineError::InstanceNotFound(_)
            | PipelineError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            PipelineError::Forbidden => StatusCode::FORBIDDEN,
            PipelineError::SubscriptionInactive => StatusCode::PAYMENT_REQUIRED,
            PipelineError::QuotaExceeded | PipelineError::InstanceLimitExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            PipelineError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::CustomerNotFound => "customer_not_found",
            PipelineError::InstanceNotFound(_) => "instance_not_found",
            PipelineError::Forbidden => "forbidden",
            PipelineError::SubscriptionNotFound => "subscription_not_found",
            PipelineError::SubscriptionInactive => "subscription_inactive",
            PipelineError::QuotaExceeded => "quota_exceeded",
            PipelineError::InstanceLimitExceeded => "instance_limit_exceeded",
            PipelineError::BackendUnavailable(_) => "backend_unavailable",
            PipelineError::Internal(_) => "internal_error",
        }
    }
}

impl From<ForwardError> for PipelineError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::Unavailable(detail) => PipelineError::BackendUnavailable(detail),
            ForwardError::Internal(err) => PipelineError::Internal(err),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
