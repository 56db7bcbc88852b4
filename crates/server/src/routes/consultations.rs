use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::{
    ConsultationRepo,
    models::consultation::{
        Consultation, ConsultationFilters, ConsultationStatus, CreateConsultation,
        UpdateConsultationStatus,
    },
};
use deployment::Deployment;
use serde::Deserialize;
use strum::VariantNames;
use tracing::info;
use utils::{
    response::{ApiResponse, Notice},
    sanitize::search_filter,
    validation::{FieldErrors, Validate, ValidationError},
};

use crate::{
    error::ApiError,
    middleware::{
        auth::{AuthUser, MaybeUser, RequireRole, StaffOrAdmin},
        validation::{IdParam, ValidJson, ValidQuery},
    },
};

/// `status` may be given several times; blank values are ignored.
#[derive(Debug, Deserialize)]
pub struct ConsultationQuery {
    #[serde(default)]
    pub status: Vec<String>,
    pub search: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl Validate for ConsultationQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        for status in self.status.iter().filter(|s| !s.is_empty()) {
            errors.one_of("status", status, ConsultationStatus::VARIANTS);
        }
        errors.date("from_date", self.from_date.as_deref());
        errors.date("to_date", self.to_date.as_deref());
        errors.finish()
    }
}

impl ConsultationQuery {
    fn into_filters(self) -> ConsultationFilters {
        ConsultationFilters {
            statuses: self
                .status
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            search: search_filter(self.search.as_deref()),
            from_date: self.from_date.filter(|d| !d.trim().is_empty()),
            to_date: self.to_date.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Anyone may submit; a signed-in requester is linked to the request.
pub async fn submit_consultation(
    State(deployment): State<Deployment>,
    MaybeUser(user): MaybeUser,
    ValidJson(payload): ValidJson<CreateConsultation>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Notice<Consultation>>>), ApiError> {
    let consultation = deployment
        .db()
        .create_consultation(&payload, user.map(|u| u.id))
        .await?;
    info!(consultation_id = %consultation.id, "Consultation submitted");

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(Notice::with_data(
            "Consultation request submitted",
            consultation,
        ))),
    ))
}

pub async fn list_consultations(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    ValidQuery(query): ValidQuery<ConsultationQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Consultation>>>, ApiError> {
    let consultations = deployment
        .db()
        .list_consultations(&query.into_filters())
        .await?;
    Ok(ResponseJson(ApiResponse::success(consultations)))
}

pub async fn my_consultations(
    State(deployment): State<Deployment>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Consultation>>>, ApiError> {
    let consultations = deployment.db().list_user_consultations(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(consultations)))
}

pub async fn update_consultation_status(
    State(deployment): State<Deployment>,
    staff: RequireRole<StaffOrAdmin>,
    IdParam(id): IdParam,
    ValidJson(payload): ValidJson<UpdateConsultationStatus>,
) -> Result<ResponseJson<ApiResponse<Consultation>>, ApiError> {
    let status = payload
        .parsed()
        .ok_or_else(|| ValidationError::field("status", "Invalid enum value"))?;
    let consultation = deployment
        .db()
        .update_consultation_status(id, status)
        .await?
        .ok_or(ApiError::NotFound("Consultation not found"))?;

    info!(
        consultation_id = %id,
        status = %status,
        updated_by = %staff.user.id,
        "Consultation status changed"
    );
    Ok(ResponseJson(ApiResponse::success(consultation)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/consultations",
        Router::new()
            .route("/", get(list_consultations).post(submit_consultation))
            .route("/my", get(my_consultations))
            .route("/{id}", patch(update_consultation_status)),
    )
}
