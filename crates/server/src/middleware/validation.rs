//! Extractors that turn malformed input into `VALIDATION_ERROR` responses.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use axum_extra::extract::Query;
use serde::de::DeserializeOwned;
use tracing::debug;
use utils::validation::{Validate, ValidationError};
use uuid::Uuid;

use crate::error::ApiError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// The offending field of a data error, when the body names one.
fn data_error_field(detail: &str) -> Option<&str> {
    let (path, _) = detail.strip_prefix(DATA_ERROR_PREFIX)?.split_once(": ")?;
    let is_path = !path.is_empty()
        && path != "."
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then_some(path)
}

/// Turns an extractor rejection into a `field: Reason` message.
fn json_rejection_message(rejection: &JsonRejection) -> String {
    let detail = rejection.body_text();
    debug!(%detail, "Rejected JSON body");
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "body: Expected JSON".to_string(),
        JsonRejection::JsonSyntaxError(_) => "body: Malformed JSON".to_string(),
        JsonRejection::JsonDataError(_) => match data_error_field(&detail) {
            Some(field) => format!("{field}: Invalid value"),
            None => "body: Invalid value".to_string(),
        },
        _ => "body: Unreadable body".to_string(),
    }
}

/// A JSON body that deserialized and passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(json_rejection_message(&rejection)))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// A query string that deserialized and passed [`Validate`]. Keys may repeat.
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!(detail = %rejection, "Rejected query string");
                ApiError::Validation("query: Invalid value".to_string())
            })?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// The `{id}` path segment, which must be a UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdParam(pub Uuid);

impl<S> FromRequestParts<S> for IdParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let invalid = || ApiError::from(ValidationError::field("id", "Invalid uuid"));
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| invalid())?;
        Uuid::parse_str(&raw).map(IdParam).map_err(|_| invalid())
    }
}
