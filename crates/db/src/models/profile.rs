use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use strum_macros::{Display, EnumString, VariantNames};
use ts_rs::TS;
use uuid::Uuid;

/// Coarse authorization role stored on every profile.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    TS,
    EnumString,
    Display,
    VariantNames,
    Default,
)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Staff,
    #[default]
    User,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Profile {
    pub id: Uuid, // Same id as the identity service's user
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

/// The slice of a profile embedded in other listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProfileSummary {
    pub full_name: String,
}

impl Profile {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"SELECT id, full_name, role, created_at
               FROM profiles
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, data: &CreateProfile) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"INSERT INTO profiles (id, full_name, role)
               VALUES ($1, $2, $3)
               RETURNING id, full_name, role, created_at"#,
        )
        .bind(data.id)
        .bind(&data.full_name)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }
}
