use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Type};
use strum::VariantNames;
use strum_macros::{Display, EnumString, VariantNames};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};
use uuid::Uuid;

const CONSULTATION_COLUMNS: &str =
    "id, name, email, phone, service, location, message, status, user_id, created_at";

/// Lifecycle of a consultation request. Any status may follow any other.
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
#[sqlx(type_name = "consultation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    #[default]
    New,
    Contacted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Consultation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: Option<String>,
    pub location: Option<String>,
    pub message: Option<String>,
    pub status: ConsultationStatus,
    pub user_id: Option<Uuid>, // Set when the requester was signed in
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateConsultation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub service: Option<String>,
    pub location: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateConsultationStatus {
    #[serde(default)]
    pub status: String,
}

impl UpdateConsultationStatus {
    /// Only meaningful after [`Validate::validate`] has passed.
    pub fn parsed(&self) -> Option<ConsultationStatus> {
        self.status.parse().ok()
    }
}

/// Staff listing filters; `search` must already be sanitized.
#[derive(Debug, Clone, Default)]
pub struct ConsultationFilters {
    pub statuses: Vec<ConsultationStatus>,
    pub search: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl Validate for CreateConsultation {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.required("name", &self.name);
        if self.email.is_empty() {
            errors.add("email", "Required");
        } else {
            errors.email("email", &self.email);
        }
        errors.required("phone", &self.phone);
        errors.finish()
    }
}

impl Validate for UpdateConsultationStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.one_of("status", &self.status, ConsultationStatus::VARIANTS);
        errors.finish()
    }
}

impl Consultation {
    pub async fn create(
        pool: &PgPool,
        data: &CreateConsultation,
        user_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Consultation>(&format!(
            r#"INSERT INTO consultations (id, name, email, phone, service, location, message, user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {CONSULTATION_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.service)
        .bind(&data.location)
        .bind(&data.message)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        filters: &ConsultationFilters,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE TRUE"
        ));

        match filters.statuses.as_slice() {
            [] => {}
            [status] => {
                query.push(" AND status = ").push_bind(*status);
            }
            statuses => {
                query
                    .push(" AND status = ANY(")
                    .push_bind(statuses.to_vec())
                    .push(")");
            }
        }
        if let Some(search) = &filters.search {
            let pattern = format!("%{search}%");
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(from_date) = &filters.from_date {
            query
                .push(" AND created_at >= ")
                .push_bind(from_date.clone())
                .push("::timestamptz");
        }
        if let Some(to_date) = &filters.to_date {
            query
                .push(" AND created_at <= ")
                .push_bind(to_date.clone())
                .push("::timestamptz");
        }
        query.push(" ORDER BY created_at DESC");

        query.build_query_as::<Consultation>().fetch_all(pool).await
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Consultation>(&format!(
            r#"SELECT {CONSULTATION_COLUMNS}
               FROM consultations
               WHERE user_id = $1
               ORDER BY created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: ConsultationStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Consultation>(&format!(
            "UPDATE consultations SET status = $2 WHERE id = $1 RETURNING {CONSULTATION_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }
}
