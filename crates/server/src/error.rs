use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    analytics::AnalyticsError,
    auth::AuthFailure,
    completion::CompletionError,
};
use thiserror::Error;
use tracing::error;
use utils::{response::ErrorResponse, validation::ValidationError};

/// Every way a request can fail. Downstream causes are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Too many requests, please try again later.")]
    RateLimited,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// A downstream call failed; `message` is what the client sees.
    #[error("{message}")]
    Downstream {
        message: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn downstream(message: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::Downstream {
            message,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Downstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Database(_) | Self::Downstream { .. } => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.message().to_string())
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        Self::downstream("AI service unavailable", err)
    }
}

impl From<AuthFailure> for ApiError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::RegistrationFailed => Self::downstream("Registration failed", err),
            AuthFailure::Rejected(message) => Self::Validation(message),
            AuthFailure::LoginFailed => Self::Unauthorized(err.to_string()),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self::downstream("Failed to fetch analytics", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Database(e) => error!("Database error: {}", e),
            Self::Downstream { message, detail } => error!("{}: {}", message, detail),
            _ => {}
        }

        let body = ErrorResponse::new(self.public_message(), Some(self.code()));
        (status, Json(body)).into_response()
    }
}
