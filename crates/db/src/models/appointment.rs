use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Type};
use strum::VariantNames;
use strum_macros::{Display, EnumString, VariantNames};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};
use uuid::Uuid;

use super::profile::ProfileSummary;

const APPOINTMENT_COLUMNS: &str =
    "id, user_id, service, preferred_date, location, status, created_at";

/// Lifecycle of an appointment. Any status may follow any other.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    TS,
    EnumString,
    Display,
    VariantNames,
    Default,
)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid, // Identity user id
    pub service: String,
    pub preferred_date: DateTime<Utc>,
    pub location: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Staff view of an appointment, with the requester's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AppointmentWithProfile {
    #[serde(flatten)]
    #[ts(flatten)]
    pub appointment: Appointment,
    pub profiles: Option<ProfileSummary>,
}

#[derive(FromRow)]
struct AppointmentRow {
    #[sqlx(flatten)]
    appointment: Appointment,
    full_name: Option<String>,
}

impl From<AppointmentRow> for AppointmentWithProfile {
    fn from(row: AppointmentRow) -> Self {
        Self {
            appointment: row.appointment,
            profiles: row.full_name.map(|full_name| ProfileSummary { full_name }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAppointment {
    #[serde(default)]
    pub service: String,
    /// A date, a local date-time such as `2025-03-01T10:00`, or an RFC 3339 timestamp.
    #[serde(default)]
    pub preferred_date: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateAppointmentStatus {
    #[serde(default)]
    pub status: String,
}

impl UpdateAppointmentStatus {
    pub fn parsed(&self) -> Option<AppointmentStatus> {
        self.status.parse().ok()
    }
}

impl Validate for CreateAppointment {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.required("service", &self.service);
        errors.required("preferred_date", &self.preferred_date);
        errors.date("preferred_date", Some(&self.preferred_date));
        errors.finish()
    }
}

impl Validate for UpdateAppointmentStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.one_of("status", &self.status, AppointmentStatus::VARIANTS);
        errors.finish()
    }
}

impl Appointment {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: &CreateAppointment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(&format!(
            r#"INSERT INTO appointments (id, user_id, service, preferred_date, location)
               VALUES ($1, $2, $3, $4::timestamptz, $5)
               RETURNING {APPOINTMENT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&data.service)
        .bind(&data.preferred_date)
        .bind(&data.location)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(&format!(
            r#"SELECT {APPOINTMENT_COLUMNS}
               FROM appointments
               WHERE user_id = $1
               ORDER BY preferred_date ASC"#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<AppointmentWithProfile>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT
                a.id, a.user_id, a.service, a.preferred_date, a.location, a.status, a.created_at,
                p.full_name
            FROM appointments a
            LEFT JOIN profiles p ON p.id = a.user_id
            WHERE TRUE"#,
        );
        match statuses {
            [] => {}
            [status] => {
                query.push(" AND a.status = ").push_bind(*status);
            }
            statuses => {
                query
                    .push(" AND a.status = ANY(")
                    .push_bind(statuses.to_vec())
                    .push(")");
            }
        }
        query.push(" ORDER BY a.preferred_date ASC");

        let rows = query
            .build_query_as::<AppointmentRow>()
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(&format!(
            "UPDATE appointments SET status = $2 WHERE id = $1 RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }
}
