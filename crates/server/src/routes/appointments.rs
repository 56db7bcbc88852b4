use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::{
    AppointmentRepo,
    models::appointment::{
        Appointment, AppointmentStatus, AppointmentWithProfile, CreateAppointment,
        UpdateAppointmentStatus,
    },
};
use deployment::Deployment;
use serde::Deserialize;
use strum::VariantNames;
use tracing::info;
use utils::{
    response::{ApiResponse, Notice},
    validation::{FieldErrors, Validate, ValidationError},
};

use crate::{
    error::ApiError,
    middleware::{
        auth::{AuthUser, RequireRole, StaffOrAdmin},
        validation::{IdParam, ValidJson, ValidQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct AppointmentQuery {
    #[serde(default)]
    pub status: Vec<String>,
}

impl Validate for AppointmentQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        for status in self.status.iter().filter(|s| !s.is_empty()) {
            errors.one_of("status", status, AppointmentStatus::VARIANTS);
        }
        errors.finish()
    }
}

impl AppointmentQuery {
    fn statuses(&self) -> Vec<AppointmentStatus> {
        self.status.iter().filter_map(|s| s.parse().ok()).collect()
    }
}

pub async fn request_appointment(
    State(deployment): State<Deployment>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CreateAppointment>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Notice<Appointment>>>), ApiError> {
    let appointment = deployment
        .db()
        .create_appointment(user.id, &payload)
        .await?;
    info!(appointment_id = %appointment.id, user_id = %user.id, "Appointment requested");

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(Notice::with_data(
            "Appointment requested",
            appointment,
        ))),
    ))
}

/// The caller's appointments, soonest preferred date first.
pub async fn my_appointments(
    State(deployment): State<Deployment>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Appointment>>>, ApiError> {
    let appointments = deployment.db().list_user_appointments(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(appointments)))
}

pub async fn list_appointments(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    ValidQuery(query): ValidQuery<AppointmentQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AppointmentWithProfile>>>, ApiError> {
    let appointments = deployment
        .db()
        .list_appointments(&query.statuses())
        .await?;
    Ok(ResponseJson(ApiResponse::success(appointments)))
}

pub async fn update_appointment_status(
    State(deployment): State<Deployment>,
    staff: RequireRole<StaffOrAdmin>,
    IdParam(id): IdParam,
    ValidJson(payload): ValidJson<UpdateAppointmentStatus>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let status = payload
        .parsed()
        .ok_or_else(|| ValidationError::field("status", "Invalid enum value"))?;
    let appointment = deployment
        .db()
        .update_appointment_status(id, status)
        .await?
        .ok_or(ApiError::NotFound("Appointment not found"))?;

    info!(
        appointment_id = %id,
        status = %status,
        updated_by = %staff.user.id,
        "Appointment status changed"
    );
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/appointments",
        Router::new()
            .route("/", get(list_appointments).post(request_appointment))
            .route("/my", get(my_appointments))
            .route("/{id}", patch(update_appointment_status)),
    )
}
