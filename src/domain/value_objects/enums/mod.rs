pub mod delivery_statuses;
pub mod directions;
pub mod instance_statuses;
pub mod subscription_statuses;
