use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};
use uuid::Uuid;

const SERVICE_COLUMNS: &str = "id, name, category, description, active, created_at";

/// A service offered by the company. Services are deactivated, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateService {
    #[serde(default)]
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateService {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl UpdateService {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.active.is_none()
    }
}

/// Listing filters; `search` must already be sanitized.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

impl Validate for CreateService {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.required("name", &self.name);
        errors.finish()
    }
}

impl Validate for UpdateService {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        if let Some(name) = &self.name {
            errors.min_len("name", name, 1);
        }
        errors.finish()
    }
}

impl Service {
    pub async fn list(pool: &PgPool, filters: &ServiceFilters) -> Result<Vec<Self>, sqlx::Error> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {SERVICE_COLUMNS} FROM services WHERE TRUE"));

        if let Some(search) = &filters.search {
            let pattern = format!("%{search}%");
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filters.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(active) = filters.active {
            query.push(" AND active = ").push_bind(active);
        }
        query.push(" ORDER BY created_at DESC");

        query.build_query_as::<Service>().fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, data: &CreateService) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            r#"INSERT INTO services (id, name, category, description)
               VALUES ($1, $2, $3, $4)
               RETURNING {SERVICE_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.category)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    /// Apply the supplied fields. Returns `None` when the service does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: &UpdateService,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE services SET ");
        {
            let mut set = query.separated(", ");
            if let Some(name) = &data.name {
                set.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(category) = &data.category {
                set.push("category = ").push_bind_unseparated(category.clone());
            }
            if let Some(description) = &data.description {
                set.push("description = ")
                    .push_bind_unseparated(description.clone());
            }
            if let Some(active) = data.active {
                set.push("active = ").push_bind_unseparated(active);
            }
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {SERVICE_COLUMNS}"));

        query.build_query_as::<Service>().fetch_optional(pool).await
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            "UPDATE services SET active = FALSE WHERE id = $1 RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
