use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub mod models;
pub mod store;

pub use store::{
    AnalyticsRepo, AppointmentRepo, ConsultationRepo, ProfileRepo, ProjectRepo, ServiceRepo, Store,
};

/// Tables the application cannot run without.
pub const REQUIRED_TABLES: &[&str] = &[
    "profiles",
    "services",
    "projects",
    "consultations",
    "appointments",
];

#[derive(Clone)]
pub struct DBService {
    pub pool: PgPool,
}

impl DBService {
    /// Connect to Postgres and apply the embedded migrations.
    pub async fn new(database_url: &str) -> Result<DBService, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(DBService { pool })
    }
}
