use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::customers;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = customers)]
pub struct CustomerEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
