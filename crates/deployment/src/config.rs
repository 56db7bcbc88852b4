use std::{env, fmt::Display, str::FromStr, time::Duration};

use secrecy::SecretString;
use services::services::assistant::BusinessCard;
use thiserror::Error;
use tracing::{info, warn};

const REQUIRED_KEYS: &[&str] = &[
    "DATABASE_URL",
    "SUPABASE_URL",
    "SUPABASE_SERVICE_ROLE_KEY",
    "CLOUDINARY_CLOUD_NAME",
    "CLOUDINARY_API_KEY",
    "CLOUDINARY_API_SECRET",
    "GROQ_API_KEY",
    "FRONTEND_URL",
];

pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub window: Duration,
    /// Requests per window per client, all routes.
    pub global_max: u32,
    /// Requests per window per client on `/auth`.
    pub auth_max: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub production: bool,
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_service_role_key: SecretString,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: SecretString,
    pub groq_api_key: SecretString,
    pub frontend_url: String,
    pub rate_limits: RateLimits,
    pub business_card: BusinessCard,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Every missing required key is
    /// reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let production = get("APP_ENV").is_some_and(|v| v == "production");
        let (default_global, default_auth) = if production { (100, 10) } else { (1000, 100) };

        let defaults = BusinessCard::default();
        let card_field = |key: &str, default: String| get(key).unwrap_or(default);

        Ok(Self {
            port: parse_or(&get, "PORT", 5000)?,
            production,
            database_url: required("DATABASE_URL"),
            supabase_url: required("SUPABASE_URL"),
            supabase_service_role_key: SecretString::from(required("SUPABASE_SERVICE_ROLE_KEY")),
            cloudinary_cloud_name: required("CLOUDINARY_CLOUD_NAME"),
            cloudinary_api_key: required("CLOUDINARY_API_KEY"),
            cloudinary_api_secret: SecretString::from(required("CLOUDINARY_API_SECRET")),
            groq_api_key: SecretString::from(required("GROQ_API_KEY")),
            frontend_url: required("FRONTEND_URL"),
            rate_limits: RateLimits {
                window: RATE_LIMIT_WINDOW,
                global_max: parse_or(&get, "RATE_LIMIT_MAX", default_global)?,
                auth_max: parse_or(&get, "AUTH_RATE_LIMIT_MAX", default_auth)?,
            },
            business_card: BusinessCard {
                name: defaults.name,
                phone: card_field("AI_COMPANY_PHONE", defaults.phone),
                email: card_field("AI_COMPANY_EMAIL", defaults.email),
                booking_url: card_field("AI_BOOKING_URL", defaults.booking_url),
                website: card_field("AI_COMPANY_WEBSITE", defaults.website),
                hours_weekdays: card_field("AI_HOURS_WEEKDAYS", defaults.hours_weekdays),
                hours_saturday: card_field("AI_HOURS_SATURDAY", defaults.hours_saturday),
            },
            sentry_dsn: get("SENTRY_DSN"),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
