//! Admin identity, delegated to the hosted auth provider.
//!
//! The bearer token is resolved against the provider's user endpoint (through
//! the bounded retry helper) and the resulting email must appear in the
//! `admin_users` table.

use async_trait::async_trait;
use axum::{async_trait as axum_async_trait, extract::FromRequestParts, http::request::Parts};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth provider is not configured")]
    Unconfigured,

    #[error("Access token rejected")]
    Rejected,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Auth provider returned a user without an email")]
    MissingEmail,
}

impl AuthError {
    fn is_transient(&self) -> bool {
        match self {
            AuthError::Http(_) => true,
            AuthError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Resolves an access token to the email of the user it belongs to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_email(&self, access_token: &str) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    email: Option<String>,
}

pub struct AuthClient {
    client: Client,
    config: AuthConfig,
    policy: RetryPolicy,
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            config,
            policy: RetryPolicy::default(),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn resolve_email(&self, access_token: &str) -> Result<String, AuthError> {
        let user = retry_with_backoff(
            self.policy,
            "admin user lookup",
            AuthError::is_transient,
            || self.fetch_user(access_token),
        )
        .await?;
        user.email
            .filter(|e| !e.is_empty())
            .ok_or(AuthError::MissingEmail)
    }
}

/// Used when `AUTH_URL` is not set: admin endpoints answer 503.
pub struct UnconfiguredIdentity;

#[async_trait]
impl IdentityProvider for UnconfiguredIdentity {
    async fn resolve_email(&self, _access_token: &str) -> Result<String, AuthError> {
        Err(AuthError::Unconfigured)
    }
}

/// Extractor for handlers restricted to administrators.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub email: String,
}

#[axum_async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let email = match state.identity.resolve_email(token).await {
            Ok(email) => email,
            Err(AuthError::Rejected) | Err(AuthError::MissingEmail) => {
                return Err(AppError::Unauthorized)
            }
            Err(AuthError::Unconfigured) => {
                return Err(AppError::ServiceUnavailable(
                    "Admin authentication is not configured".to_string(),
                ))
            }
            Err(e) => {
                error!("Admin user lookup failed: {e}");
                return Err(AppError::ServiceUnavailable(
                    "Authentication service unavailable".to_string(),
                ));
            }
        };

        if !state.store.is_admin(&email).await? {
            warn!(email = %email, "Non-admin attempted an admin action");
            return Err(AppError::Forbidden);
        }

        Ok(AdminUser { email })
    }
}

#[cfg(test)]
pub use fake::StaticIdentity;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AuthError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(AuthError::Api {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(!AuthError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!AuthError::Rejected.is_transient());
    }
}
