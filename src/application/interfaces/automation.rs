use async_trait::async_trait;
use thiserror::Error;

use crate::domain::value_objects::forwarding::{ForwardRequest, ForwardResponse};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("automation backend unreachable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Boundary to the messaging automation backend. Any HTTP response,
/// success or failure, comes back as `ForwardResponse`; `Unavailable`
/// is reserved for requests that never produced a response at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationGateway: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ForwardError>;
}
