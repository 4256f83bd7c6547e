//! Cookie-token authentication delegated to the external identity service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Deserialize;

use super::handlers::{ApiError, AppState};

/// Cookie carrying the access token
pub const AUTH_COOKIE: &str = "authToken";

/// Identity returned by the user service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub role: String,
}

/// Access level a route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    User,
    Admin,
}

impl AuthScope {
    fn verify_path(&self) -> &'static str {
        match self {
            AuthScope::User => "/api/internal/auth/verify",
            AuthScope::Admin => "/api/internal/auth/verify-admin",
        }
    }
}

/// Verifies access tokens
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str, scope: AuthScope) -> Result<AuthUser, AuthError>;
}

/// `AuthVerifier` backed by the identity service's verify endpoints
pub struct HttpAuthVerifier {
    client: reqwest::Client,
    base_uri: String,
}

impl HttpAuthVerifier {
    pub fn new(base_uri: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthVerifier for HttpAuthVerifier {
    async fn verify(&self, token: &str, scope: AuthScope) -> Result<AuthUser, AuthError> {
        let url = format!("{}{}", self.base_uri, scope.verify_path());

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, format!("{}={}", AUTH_COOKIE, token))
            .send()
            .await
            .map_err(|e| AuthError::Service(format!("Failed to reach user service: {}", e)))?;

        match response.status().as_u16() {
            200..=299 => response
                .json::<AuthUser>()
                .await
                .map_err(|e| AuthError::Service(format!("Invalid user service response: {}", e))),
            401 => Err(AuthError::Rejected),
            403 => Err(AuthError::Forbidden),
            status => Err(AuthError::Service(format!(
                "User service returned status {}",
                status
            ))),
        }
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token is required")]
    MissingToken,

    #[error("Access token is invalid or expired")]
    Rejected,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Auth service error: {0}")]
    Service(String),
}

/// Extract the access token from the request's `Cookie` headers
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

async fn authenticate(
    parts: &Parts,
    state: &Arc<AppState>,
    scope: AuthScope,
) -> Result<AuthUser, ApiError> {
    let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
    let user = state.auth.verify(&token, scope).await?;
    tracing::debug!(user_id = %user.id, role = %user.role, ?scope, "Request authenticated");
    Ok(user)
}

/// Any signed-in user
pub struct AuthenticatedUser(pub AuthUser);

/// A signed-in administrator
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, AuthScope::User).await.map(Self)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, AuthScope::Admin).await.map(Self)
    }
}
