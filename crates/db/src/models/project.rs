use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};
use uuid::Uuid;

const PROJECT_COLUMNS: &str = "id, title, service_id, location, stage, description, images, created_at";

const PROJECT_WITH_SERVICE_SELECT: &str = r#"SELECT
        p.id, p.title, p.service_id, p.location, p.stage, p.description, p.images, p.created_at,
        s.name AS service_name
    FROM projects p
    LEFT JOIN services s ON s.id = p.service_id"#;

/// A portfolio project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub service_id: Option<Uuid>, // Foreign key to Service
    pub location: Option<String>,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ServiceSummary {
    pub name: String,
}

/// A project together with the name of the service it showcases.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectWithService {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub services: Option<ServiceSummary>,
}

impl std::ops::Deref for ProjectWithService {
    type Target = Project;
    fn deref(&self) -> &Self::Target {
        &self.project
    }
}

#[derive(FromRow)]
struct ProjectRow {
    #[sqlx(flatten)]
    project: Project,
    service_name: Option<String>,
}

impl From<ProjectRow> for ProjectWithService {
    fn from(row: ProjectRow) -> Self {
        Self {
            project: row.project,
            services: row.service_name.map(|name| ServiceSummary { name }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    #[serde(default)]
    pub title: String,
    pub service_id: Option<String>,
    pub location: Option<String>,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub service_id: Option<String>,
    pub location: Option<String>,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.service_id.is_none()
            && self.location.is_none()
            && self.stage.is_none()
            && self.description.is_none()
            && self.images.is_none()
    }
}

/// Listing filters; `search` and `location` must already be sanitized.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilters {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub service_id: Option<Uuid>,
}

impl Validate for CreateProject {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.required("title", &self.title);
        errors.uuid("service_id", self.service_id.as_deref());
        errors.urls("images", self.images.as_deref());
        errors.finish()
    }
}

impl Validate for UpdateProject {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        if let Some(title) = &self.title {
            errors.min_len("title", title, 1);
        }
        errors.uuid("service_id", self.service_id.as_deref());
        errors.urls("images", self.images.as_deref());
        errors.finish()
    }
}

// Only called after validation, so unparsable ids have already been rejected.
fn parse_service_id(value: Option<&str>) -> Option<Uuid> {
    value.and_then(|v| Uuid::parse_str(v).ok())
}

impl Project {
    pub async fn list(
        pool: &PgPool,
        filters: &ProjectFilters,
    ) -> Result<Vec<ProjectWithService>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(PROJECT_WITH_SERVICE_SELECT);
        query.push(" WHERE TRUE");

        if let Some(search) = &filters.search {
            let pattern = format!("%{search}%");
            query
                .push(" AND (p.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(stage) = &filters.stage {
            query.push(" AND p.stage = ").push_bind(stage.clone());
        }
        if let Some(location) = &filters.location {
            query
                .push(" AND p.location ILIKE ")
                .push_bind(format!("%{location}%"));
        }
        if let Some(service_id) = filters.service_id {
            query.push(" AND p.service_id = ").push_bind(service_id);
        }
        query.push(" ORDER BY p.created_at DESC");

        let rows = query.build_query_as::<ProjectRow>().fetch_all(pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<ProjectWithService>, sqlx::Error> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "{PROJECT_WITH_SERVICE_SELECT} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(pool: &PgPool, data: &CreateProject) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"INSERT INTO projects (id, title, service_id, location, stage, description, images)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {PROJECT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(parse_service_id(data.service_id.as_deref()))
        .bind(&data.location)
        .bind(&data.stage)
        .bind(&data.description)
        .bind(data.images.clone().unwrap_or_default())
        .fetch_one(pool)
        .await
    }

    /// Apply only the supplied fields. Returns `None` when the project does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Ok(Self::find_by_id(pool, id).await?.map(|p| p.project));
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE projects SET ");
        {
            let mut set = query.separated(", ");
            if let Some(title) = &data.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if data.service_id.is_some() {
                set.push("service_id = ")
                    .push_bind_unseparated(parse_service_id(data.service_id.as_deref()));
            }
            if let Some(location) = &data.location {
                set.push("location = ").push_bind_unseparated(location.clone());
            }
            if let Some(stage) = &data.stage {
                set.push("stage = ").push_bind_unseparated(stage.clone());
            }
            if let Some(description) = &data.description {
                set.push("description = ")
                    .push_bind_unseparated(description.clone());
            }
            if let Some(images) = &data.images {
                set.push("images = ").push_bind_unseparated(images.clone());
            }
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {PROJECT_COLUMNS}"));

        query.build_query_as::<Project>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
