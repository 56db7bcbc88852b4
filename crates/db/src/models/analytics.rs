//! Raw reads behind the dashboard. Aggregation happens in the service layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{appointment::AppointmentStatus, consultation::ConsultationStatus};

/// Tables the dashboard counts rows of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Projects,
    Consultations,
    Appointments,
}

impl RecordKind {
    fn table(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Consultations => "consultations",
            Self::Appointments => "appointments",
        }
    }
}

/// Tables holding customer requests, which carry a free-text service name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Consultations,
    Appointments,
}

impl RequestKind {
    fn table(self) -> &'static str {
        match self {
            Self::Consultations => "consultations",
            Self::Appointments => "appointments",
        }
    }
}

pub struct Analytics;

impl Analytics {
    /// Count rows, optionally only those created at or after `since`.
    pub async fn count(
        pool: &PgPool,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE $1::timestamptz IS NULL OR created_at >= $1",
            kind.table()
        ))
        .bind(since)
        .fetch_one(pool)
        .await
    }

    pub async fn project_stages(pool: &PgPool) -> Result<Vec<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT stage FROM projects")
            .fetch_all(pool)
            .await
    }

    pub async fn consultation_statuses(
        pool: &PgPool,
    ) -> Result<Vec<ConsultationStatus>, sqlx::Error> {
        sqlx::query_scalar::<_, ConsultationStatus>("SELECT status FROM consultations")
            .fetch_all(pool)
            .await
    }

    pub async fn appointment_statuses(
        pool: &PgPool,
    ) -> Result<Vec<AppointmentStatus>, sqlx::Error> {
        sqlx::query_scalar::<_, AppointmentStatus>("SELECT status FROM appointments")
            .fetch_all(pool)
            .await
    }

    /// Creation times in ascending order.
    pub async fn creation_times(
        pool: &PgPool,
        kind: RequestKind,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar::<_, DateTime<Utc>>(&format!(
            "SELECT created_at FROM {} ORDER BY created_at ASC",
            kind.table()
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn requested_services(
        pool: &PgPool,
        kind: RequestKind,
    ) -> Result<Vec<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(&format!(
            "SELECT service FROM {} ORDER BY created_at ASC",
            kind.table()
        ))
        .fetch_all(pool)
        .await
    }
}
