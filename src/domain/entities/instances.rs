use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::instances;

/// A messaging session registered with the automation backend.
/// `instance_id` is the backend's identifier; `id` is ours.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = instances)]
pub struct InstanceEntity {
    pub id: Uuid,
    pub instance_id: String,
    pub customer_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub status: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = instances)]
pub struct InsertInstanceEntity {
    pub instance_id: String,
    pub customer_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub status: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
