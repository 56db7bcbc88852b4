//! Registration, login and the caller's own profile.

use db::{
    ProfileRepo,
    models::profile::{CreateProfile, Profile, Role},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};
use uuid::Uuid;

use super::identity::{IdentityError, IdentityProvider, SignIn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The identity provider refused the request. Carries its message.
    #[error("{0}")]
    Rejected(String),
    #[error("Registration failed")]
    RegistrationFailed,
    #[error("Login failed")]
    LoginFailed,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RegisterBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

impl Validate for RegisterBody {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.email("email", &self.email);
        errors.min_len("password", &self.password, 6);
        errors.required("full_name", &self.full_name);
        errors.finish()
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginBody {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.email("email", &self.email);
        errors.min_len("password", &self.password, 1);
        errors.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MeUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MeProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MeResponse {
    pub user: MeUser,
    pub profile: MeProfile,
}

impl MeResponse {
    /// A user without a profile row still reads as a plain `USER`.
    pub fn new(user_id: Uuid, email: Option<String>, profile: Option<Profile>) -> Self {
        let profile = match profile {
            Some(p) => MeProfile {
                id: Some(p.id),
                full_name: Some(p.full_name),
                role: p.role,
            },
            None => MeProfile {
                id: None,
                full_name: None,
                role: Role::User,
            },
        };
        Self {
            user: MeUser { id: user_id, email },
            profile,
        }
    }
}

pub struct AuthService<'a, P: ProfileRepo + ?Sized> {
    identity: &'a dyn IdentityProvider,
    profiles: &'a P,
}

impl<'a, P: ProfileRepo + ?Sized> AuthService<'a, P> {
    pub fn new(identity: &'a dyn IdentityProvider, profiles: &'a P) -> Self {
        Self { identity, profiles }
    }

    /// Creates the identity user, then its profile. A failed profile insert
    /// deletes the identity user again, best-effort.
    pub async fn register(&self, body: &RegisterBody) -> Result<Registered, AuthFailure> {
        let signed_up = match self.identity.sign_up(&body.email, &body.password).await {
            Ok(signed_up) => signed_up,
            Err(IdentityError::Rejected { message, .. }) => return Err(AuthFailure::Rejected(message)),
            Err(e) => {
                error!("Sign-up request failed: {}", e);
                return Err(AuthFailure::RegistrationFailed);
            }
        };
        let Some(user) = signed_up.user else {
            return Err(AuthFailure::RegistrationFailed);
        };

        let profile = CreateProfile {
            id: user.id,
            full_name: body.full_name.clone(),
            role: Role::User,
        };
        if let Err(e) = self.profiles.create_profile(&profile).await {
            error!(user_id = %user.id, "Failed to create profile: {}", e);
            if let Err(e) = self.identity.delete_user(user.id).await {
                warn!(user_id = %user.id, "Failed to roll back identity user: {}", e);
            }
            return Err(AuthFailure::RegistrationFailed);
        }

        info!(user_id = %user.id, "Registered new user");
        Ok(Registered { user_id: user.id })
    }

    pub async fn login(&self, body: &LoginBody) -> Result<SignIn, AuthFailure> {
        match self.identity.sign_in(&body.email, &body.password).await {
            Ok(signed_in) => Ok(signed_in),
            Err(IdentityError::Rejected { message, .. }) => Err(AuthFailure::Rejected(message)),
            Err(e) => {
                warn!("Sign-in request failed: {}", e);
                Err(AuthFailure::LoginFailed)
            }
        }
    }
}
