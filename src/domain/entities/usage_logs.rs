use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::usage_logs;

/// Append-only audit row, one per forwarded attempt. `instance_id` is
/// null when provisioning failed before any instance row existed.
/// `created_at` is assigned by Postgres and drives quota counting.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = usage_logs)]
pub struct UsageLogEntity {
    pub id: Uuid,
    pub instance_id: Option<Uuid>,
    pub message_id: String,
    pub status: String,
    pub direction: String,
    pub customer_id: Uuid,
    pub subscription_id: Uuid,
    pub request_payload: Option<Value>,
    pub response_payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = usage_logs)]
pub struct InsertUsageLogEntity {
    pub instance_id: Option<Uuid>,
    pub message_id: String,
    pub status: String,
    pub direction: String,
    pub customer_id: Uuid,
    pub subscription_id: Uuid,
    pub request_payload: Option<Value>,
    pub response_payload: Option<Value>,
}
