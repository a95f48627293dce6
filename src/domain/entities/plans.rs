use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::plans;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: Option<String>,
    pub max_messages_per_month: i32,
    pub max_instances: i32,
    pub is_active: bool,
}
