//! Bearer-token authentication and role checks as extractors.
//!
//! Guards run in handler-parameter order, so handlers list them as
//! authentication, then role, then path, then body.

use std::marker::PhantomData;

use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use db::{
    ProfileRepo,
    models::profile::{Profile, Role},
};
use deployment::Deployment;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// A caller whose bearer token the identity provider accepted.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl FromRequestParts<Deployment> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &Deployment,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized("Unauthorized".to_string()))?;

        let identity = deployment
            .identity()
            .get_user(bearer.token())
            .await
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::Unauthorized("Invalid token".to_string())
            })?;

        let user = AuthUser {
            id: identity.id,
            email: identity.email,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// The caller if a valid token was sent; anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<Deployment> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &Deployment,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            AuthUser::from_request_parts(parts, deployment).await.ok(),
        ))
    }
}

/// The set of roles a route admits.
pub trait RolePolicy: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

pub struct AdminOnly;

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

pub struct StaffOrAdmin;

impl RolePolicy for StaffOrAdmin {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::Staff];
}

/// An authenticated caller whose profile role is allowed by `P`.
/// The profile is read on every request.
pub struct RequireRole<P: RolePolicy> {
    pub user: AuthUser,
    pub profile: Profile,
    _policy: PhantomData<P>,
}

impl<P: RolePolicy> FromRequestParts<Deployment> for RequireRole<P> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &Deployment,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, deployment).await?;

        let profile = match deployment.db().find_profile(user.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(ApiError::Forbidden("Profile not found or access denied")),
            Err(e) => {
                debug!(user_id = %user.id, "Profile lookup failed: {}", e);
                return Err(ApiError::Forbidden("Profile not found or access denied"));
            }
        };

        if !P::ALLOWED.contains(&profile.role) {
            debug!(user_id = %user.id, role = %profile.role, "Role not allowed");
            return Err(ApiError::Forbidden("Forbidden"));
        }

        Ok(Self {
            user,
            profile,
            _policy: PhantomData,
        })
    }
}
