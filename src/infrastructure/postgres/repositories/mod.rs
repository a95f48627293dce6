pub mod customers;
pub mod instances;
pub mod plans;
pub mod subscriptions;
pub mod usage_logs;
