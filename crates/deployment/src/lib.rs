//! Everything a request handler can reach: the store, the outbound clients
//! and the loaded configuration, constructed once at boot.

use std::sync::Arc;

use db::{DBService, REQUIRED_TABLES, Store};
use secrecy::ExposeSecret;
use services::services::{
    assistant::Assistant,
    completion::{CompletionClient, CompletionError},
    database_validator::{DatabaseValidationError, DatabaseValidator},
    identity::{GoTrueClient, IdentityError, IdentityProvider},
    media::{CloudinaryClient, MediaError, MediaStore},
};
use thiserror::Error;
use tracing::info;

pub mod config;

use config::{Config, ConfigError};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Schema(#[from] DatabaseValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Clone)]
pub struct Deployment {
    db: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    assistant: Assistant,
    media: Arc<dyn MediaStore>,
    config: Arc<Config>,
}

impl Deployment {
    /// Connects to Postgres, runs migrations, checks the schema and builds the
    /// live HTTP clients.
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        DatabaseValidator::new(db.pool.clone())
            .validate(REQUIRED_TABLES)
            .await?;

        let identity = GoTrueClient::new(
            &config.supabase_url,
            config.supabase_service_role_key.clone(),
        )?;
        let completion = CompletionClient::new(config.groq_api_key.clone(), None)?;
        let media = CloudinaryClient::new(
            config.cloudinary_cloud_name.clone(),
            config.cloudinary_api_key.clone(),
            config.cloudinary_api_secret.clone(),
        )?;

        info!(
            supabase_url = %config.supabase_url,
            cloudinary_cloud = %config.cloudinary_cloud_name,
            groq_key_set = !config.groq_api_key.expose_secret().is_empty(),
            "Deployment ready"
        );

        let assistant = Assistant::new(Arc::new(completion), config.business_card.clone());
        Ok(Self::from_parts(
            Arc::new(db),
            Arc::new(identity),
            assistant,
            Arc::new(media),
            config,
        ))
    }

    /// Assembles a deployment from already-built parts.
    pub fn from_parts(
        db: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        assistant: Assistant,
        media: Arc<dyn MediaStore>,
        config: Config,
    ) -> Self {
        Self {
            db,
            identity,
            assistant,
            media,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &dyn Store {
        self.db.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn media(&self) -> &dyn MediaStore {
        self.media.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
