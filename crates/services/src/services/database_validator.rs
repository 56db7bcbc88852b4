//! Boot-time schema check run after migrations.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}

pub struct DatabaseValidator {
    pool: PgPool,
}

impl DatabaseValidator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Confirms every required table exists in the current schema.
    pub async fn validate(
        &self,
        required_tables: &[&str],
    ) -> Result<SchemaReport, DatabaseValidationError> {
        let missing_tables = self.missing_tables(required_tables).await?;
        if !missing_tables.is_empty() {
            warn!(missing = ?missing_tables, "Required tables are missing");
            return Err(DatabaseValidationError::MissingTables(missing_tables));
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success",
        )
        .fetch_one(&self.pool)
        .await?;
        let latest_migration = self.latest_migration().await?;

        let report = SchemaReport {
            migrations_applied,
            latest_migration,
        };
        info!(migrations_applied, "{}", report.summary());
        Ok(report)
    }

    pub async fn missing_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let present = sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = ANY($1)",
        )
        .bind(required_tables)
        .fetch_all(&self.pool)
        .await?;

        Ok(required_tables
            .iter()
            .filter(|table| !present.iter().any(|p| p == *table))
            .map(|table| table.to_string())
            .collect())
    }

    async fn latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(migration)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaReport {
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
}

impl SchemaReport {
    pub fn summary(&self) -> String {
        match &self.latest_migration {
            Some(latest) => format!(
                "Database OK - {} migrations applied, latest: {}",
                self.migrations_applied, latest
            ),
            None => format!("Database OK - {} migrations applied", self.migrations_applied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_names_latest_migration() {
        let report = SchemaReport {
            migrations_applied: 1,
            latest_migration: Some("init".to_string()),
        };
        assert_eq!(report.summary(), "Database OK - 1 migrations applied, latest: init");
    }

    #[test]
    fn missing_tables_error_lists_names() {
        let err = DatabaseValidationError::MissingTables(vec![
            "profiles".to_string(),
            "services".to_string(),
        ]);
        assert_eq!(err.to_string(), "missing tables: profiles, services");
    }
}
