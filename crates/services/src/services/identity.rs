//! Identity provider client (Supabase GoTrue REST API).
//!
//! Tokens are issued and verified by the provider. This module only forwards
//! credentials and bearer tokens and maps the replies into typed values.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use ts_rs::TS;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The provider answered with an error status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("unexpected response: {0}")]
    Serde(String),
    #[error("invalid identity url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
}

/// Result of a password sign-up. Without auto-confirm there is no session yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: Option<IdentityUser>,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct SignIn {
    pub user: IdentityUser,
    pub session: Session,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError>;

    /// Resolves the user behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    session: Session,
    user: IdentityUser,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: Client,
    auth_url: Url,
    service_key: SecretString,
}

impl GoTrueClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(project_url: &str, service_key: SecretString) -> Result<Self, IdentityError> {
        let base = project_url.trim_end_matches('/');
        let auth_url = Url::parse(&format!("{base}/auth/v1/"))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            auth_url,
            service_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(self.auth_url.join(path)?)
    }

    fn with_api_key(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", self.service_key.expose_secret())
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, IdentityError> {
        let res = req.send().await.map_err(map_reqwest_error)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message: error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed"))
                .to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, IdentityError> {
        let req = self
            .with_api_key(self.http.post(self.endpoint("signup")?))
            .json(&Credentials { email, password });
        let body = self
            .send(req)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| IdentityError::Serde(e.to_string()))?;
        parse_sign_up(body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let req = self
            .with_api_key(self.http.post(url))
            .json(&Credentials { email, password });
        let token = self
            .send(req)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| IdentityError::Serde(e.to_string()))?;

        Ok(SignIn {
            user: token.user,
            session: token.session,
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let req = self
            .with_api_key(self.http.get(self.endpoint("user")?))
            .bearer_auth(access_token);
        self.send(req)
            .await?
            .json::<IdentityUser>()
            .await
            .map_err(|e| IdentityError::Serde(e.to_string()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let req = self
            .with_api_key(self.http.delete(self.endpoint(&format!("admin/users/{id}"))?))
            .bearer_auth(self.service_key.expose_secret());
        self.send(req).await.map(|_| ())
    }
}

/// Sign-up answers with a full token response when the account is auto-confirmed,
/// otherwise with the bare user.
fn parse_sign_up(body: Value) -> Result<SignUp, IdentityError> {
    if body.get("access_token").is_some() {
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| IdentityError::Serde(e.to_string()))?;
        return Ok(SignUp {
            user: Some(token.user),
            session: Some(token.session),
        });
    }

    let user = match body.get("id") {
        Some(_) => Some(
            serde_json::from_value::<IdentityUser>(body)
                .map_err(|e| IdentityError::Serde(e.to_string()))?,
        ),
        None => None,
    };
    Ok(SignUp {
        user,
        session: None,
    })
}

fn error_message(body: &Value) -> Option<&str> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
}

fn map_reqwest_error(e: reqwest::Error) -> IdentityError {
    if e.is_timeout() {
        IdentityError::Timeout
    } else {
        IdentityError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const USER_ID: &str = "6f1c2b1e-4a7d-4c39-9d39-2f4f0b6d8a11";

    #[test]
    fn sign_up_with_session() {
        let body = json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_700_000_000,
            "refresh_token": "refresh",
            "user": { "id": USER_ID, "email": "a@b.com", "aud": "authenticated" }
        });
        let signed = parse_sign_up(body).unwrap();
        assert_eq!(signed.session.unwrap().access_token, "jwt");
        assert_eq!(signed.user.unwrap().email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn sign_up_pending_confirmation() {
        let body = json!({ "id": USER_ID, "email": "a@b.com", "confirmation_sent_at": "2025-01-01T00:00:00Z" });
        let signed = parse_sign_up(body).unwrap();
        assert!(signed.session.is_none());
        assert_eq!(signed.user.unwrap().id.to_string(), USER_ID);
    }

    #[test]
    fn error_message_prefers_msg() {
        assert_eq!(
            error_message(&json!({ "code": 400, "msg": "Invalid login credentials" })),
            Some("Invalid login credentials")
        );
        assert_eq!(
            error_message(&json!({ "error": "invalid_grant", "error_description": "Email not confirmed" })),
            Some("Email not confirmed")
        );
        assert_eq!(error_message(&Value::Null), None);
    }

    #[test]
    fn auth_endpoints_hang_off_project_url() {
        let client = GoTrueClient::new("https://abc.supabase.co/", SecretString::from("key")).unwrap();
        assert_eq!(
            client.endpoint("token").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/token"
        );
    }
}
