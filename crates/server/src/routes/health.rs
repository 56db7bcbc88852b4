use axum::{Router, response::Json as ResponseJson, routing::get};
use chrono::{DateTime, Utc};
use deployment::Deployment;
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn health_check() -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok",
        timestamp: Utc::now(),
    }))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/health", get(health_check))
}
