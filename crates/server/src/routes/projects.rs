use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    ProjectRepo,
    models::project::{CreateProject, Project, ProjectFilters, ProjectWithService, UpdateProject},
};
use deployment::Deployment;
use serde::Deserialize;
use tracing::info;
use utils::{
    response::{ApiResponse, Notice},
    sanitize::search_filter,
    validation::{FieldErrors, Validate, ValidationError},
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{
        auth::{AdminOnly, RequireRole, StaffOrAdmin},
        validation::{IdParam, ValidJson, ValidQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub service_id: Option<String>,
}

impl Validate for ProjectQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.uuid(
            "service_id",
            self.service_id.as_deref().filter(|id| !id.is_empty()),
        );
        errors.finish()
    }
}

impl ProjectQuery {
    fn into_filters(self) -> ProjectFilters {
        ProjectFilters {
            search: search_filter(self.search.as_deref()),
            stage: self.stage.filter(|s| !s.is_empty()),
            location: search_filter(self.location.as_deref()),
            service_id: self
                .service_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok()),
        }
    }
}

pub async fn list_projects(
    State(deployment): State<Deployment>,
    ValidQuery(query): ValidQuery<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithService>>>, ApiError> {
    let projects = deployment
        .db()
        .list_projects(&query.into_filters())
        .await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    State(deployment): State<Deployment>,
    IdParam(id): IdParam,
) -> Result<ResponseJson<ApiResponse<ProjectWithService>>, ApiError> {
    let project = deployment
        .db()
        .find_project(id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn create_project(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    ValidJson(payload): ValidJson<CreateProject>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Project>>), ApiError> {
    let project = deployment.db().create_project(&payload).await?;
    info!(project_id = %project.id, "Created project");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(project)),
    ))
}

/// Only the supplied fields change.
pub async fn update_project(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    IdParam(id): IdParam,
    ValidJson(payload): ValidJson<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    let project = deployment
        .db()
        .update_project(id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(deployment): State<Deployment>,
    _admin: RequireRole<AdminOnly>,
    IdParam(id): IdParam,
) -> Result<ResponseJson<ApiResponse<Notice<()>>>, ApiError> {
    let rows_affected = deployment.db().delete_project(id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Project not found"));
    }
    info!(project_id = %id, "Deleted project");
    Ok(ResponseJson(ApiResponse::success(Notice::message(
        "Project deleted",
    ))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/projects",
        Router::new()
            .route("/", get(list_projects).post(create_project))
            .route(
                "/{id}",
                get(get_project).put(update_project).delete(delete_project),
            ),
    )
}
