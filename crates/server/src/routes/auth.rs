use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::ProfileRepo;
use deployment::Deployment;
use services::services::{
    auth::{AuthFailure, AuthService, LoginBody, MeResponse, RegisterBody},
    identity::SignIn,
};
use tracing::warn;
use utils::response::{ApiResponse, Notice};

use crate::{
    error::ApiError,
    middleware::{
        auth::AuthUser,
        rate_limit::{RateLimiter, limit},
        validation::ValidJson,
    },
};

pub async fn register(
    State(deployment): State<Deployment>,
    ValidJson(body): ValidJson<RegisterBody>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Notice<()>>>), ApiError> {
    AuthService::new(deployment.identity(), deployment.db())
        .register(&body)
        .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(Notice::message(
            "Registered successfully",
        ))),
    ))
}

/// Every login failure is a 401 carrying the provider's message.
pub async fn login(
    State(deployment): State<Deployment>,
    ValidJson(body): ValidJson<LoginBody>,
) -> Result<ResponseJson<ApiResponse<SignIn>>, ApiError> {
    let signed_in = AuthService::new(deployment.identity(), deployment.db())
        .login(&body)
        .await
        .map_err(|failure| match failure {
            AuthFailure::Rejected(message) => ApiError::Unauthorized(message),
            other => ApiError::Unauthorized(other.to_string()),
        })?;

    Ok(ResponseJson(ApiResponse::success(signed_in)))
}

pub async fn me(
    State(deployment): State<Deployment>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<MeResponse>>, ApiError> {
    let profile = match deployment.db().find_profile(user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %user.id, "Profile lookup failed: {}", e);
            None
        }
    };

    Ok(ResponseJson(ApiResponse::success(MeResponse::new(
        user.id, user.email, profile,
    ))))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let limits = deployment.config().rate_limits;
    let auth_limiter = RateLimiter::new(limits.auth_max, limits.window);

    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/me", get(me))
            .layer(from_fn_with_state(auth_limiter, limit)),
    )
}
