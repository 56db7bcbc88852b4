use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    ServiceRepo,
    models::service::{CreateService, Service, ServiceFilters, UpdateService},
};
use deployment::Deployment;
use serde::Deserialize;
use tracing::info;
use utils::{
    response::{ApiResponse, Notice},
    sanitize::search_filter,
    validation::{Validate, ValidationError},
};

use crate::{
    error::ApiError,
    middleware::{
        auth::{AdminOnly, RequireRole},
        validation::{IdParam, ValidJson, ValidQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub active: Option<String>,
}

impl Validate for ServiceQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl ServiceQuery {
    /// `active` only filters when it is exactly `true` or `false`.
    fn into_filters(self) -> ServiceFilters {
        ServiceFilters {
            search: search_filter(self.search.as_deref()),
            category: self.category.filter(|c| !c.is_empty()),
            active: match self.active.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
        }
    }
}

pub async fn list_services(
    State(deployment): State<Deployment>,
    ValidQuery(query): ValidQuery<ServiceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Service>>>, ApiError> {
    let services = deployment
        .db()
        .list_services(&query.into_filters())
        .await?;
    Ok(ResponseJson(ApiResponse::success(services)))
}

pub async fn get_service(
    State(deployment): State<Deployment>,
    IdParam(id): IdParam,
) -> Result<ResponseJson<ApiResponse<Service>>, ApiError> {
    let service = deployment
        .db()
        .find_service(id)
        .await?
        .ok_or(ApiError::NotFound("Service not found"))?;
    Ok(ResponseJson(ApiResponse::success(service)))
}

pub async fn create_service(
    State(deployment): State<Deployment>,
    _admin: RequireRole<AdminOnly>,
    ValidJson(payload): ValidJson<CreateService>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Service>>), ApiError> {
    let service = deployment.db().create_service(&payload).await?;
    info!(service_id = %service.id, "Created service");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(service)),
    ))
}

pub async fn update_service(
    State(deployment): State<Deployment>,
    _admin: RequireRole<AdminOnly>,
    IdParam(id): IdParam,
    ValidJson(payload): ValidJson<UpdateService>,
) -> Result<ResponseJson<ApiResponse<Service>>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    let service = deployment
        .db()
        .update_service(id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Service not found"))?;
    Ok(ResponseJson(ApiResponse::success(service)))
}

/// Soft delete: the row stays with `active = false`.
pub async fn deactivate_service(
    State(deployment): State<Deployment>,
    _admin: RequireRole<AdminOnly>,
    IdParam(id): IdParam,
) -> Result<ResponseJson<ApiResponse<Notice<Service>>>, ApiError> {
    let service = deployment
        .db()
        .deactivate_service(id)
        .await?
        .ok_or(ApiError::NotFound("Service not found"))?;
    info!(service_id = %id, "Deactivated service");
    Ok(ResponseJson(ApiResponse::success(Notice::with_data(
        "Service deactivated",
        service,
    ))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/services",
        Router::new()
            .route("/", get(list_services).post(create_service))
            .route(
                "/{id}",
                get(get_service)
                    .put(update_service)
                    .delete(deactivate_service),
            ),
    )
}
