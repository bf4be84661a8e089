use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::assessment::scoring::ScoringError;
use crate::report::engine::RenderError;
use crate::store::StoreError;
use crate::tokens::TokenError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Download link has expired")]
    TokenExpired,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::Unconfigured => {
                AppError::ServiceUnavailable("Backend is not configured".to_string())
            }
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(e: ScoringError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => {
                AppError::NotFound("Download link is invalid or has been revoked".to_string())
            }
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::TokenExpired => (
                StatusCode::NOT_FOUND,
                "TOKEN_EXPIRED",
                "This download link has expired. Request a new report email.".to_string(),
            ),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "The report could not be generated".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_map_to_not_found_statuses() {
        let invalid = AppError::from(TokenError::Invalid).into_response();
        assert_eq!(invalid.status(), StatusCode::NOT_FOUND);

        let expired = AppError::from(TokenError::Expired).into_response();
        assert_eq!(expired.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unconfigured_store_is_503() {
        let response = AppError::from(StoreError::Unconfigured).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_store_not_found_stays_distinct_from_backend_errors() {
        let missing = AppError::from(StoreError::NotFound("Download token".to_string()));
        assert_eq!(missing.to_string(), "Not found: Download token not found");
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let backend = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(
            backend.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_scoring_error_is_validation() {
        let response = AppError::from(ScoringError::NoAnswers).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
