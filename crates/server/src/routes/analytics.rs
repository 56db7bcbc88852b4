use std::collections::BTreeMap;

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use chrono::Utc;
use deployment::Deployment;
use services::services::analytics::{
    AnalyticsService, DashboardStats, MonthlyActivity, ServiceCount,
};
use utils::response::ApiResponse;

use crate::{
    error::ApiError,
    middleware::auth::{RequireRole, StaffOrAdmin},
};

pub async fn stats(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = AnalyticsService::new(deployment.db())
        .stats(Utc::now())
        .await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn trends(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
) -> Result<ResponseJson<ApiResponse<BTreeMap<String, MonthlyActivity>>>, ApiError> {
    let trends = AnalyticsService::new(deployment.db())
        .trends()
        .await
        .map_err(|e| ApiError::downstream("Failed to fetch trends", e))?;
    Ok(ResponseJson(ApiResponse::success(trends)))
}

pub async fn popular_services(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
) -> Result<ResponseJson<ApiResponse<Vec<ServiceCount>>>, ApiError> {
    let popular = AnalyticsService::new(deployment.db())
        .popular_services()
        .await
        .map_err(|e| ApiError::downstream("Failed to fetch popular services", e))?;
    Ok(ResponseJson(ApiResponse::success(popular)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/analytics",
        Router::new()
            .route("/stats", get(stats))
            .route("/trends", get(trends))
            .route("/popular-services", get(popular_services)),
    )
}
