pub mod automation_http;
pub mod axum_http;
pub mod postgres;
