pub mod errors;
pub mod instance_provisioning;
pub mod instance_status;
pub mod outcome_logger;
pub mod ownership_resolver;
pub mod payload_resolver;
pub mod plan_resolver;
pub mod proxy_pipeline;
pub mod quota;
