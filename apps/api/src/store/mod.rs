//! Backend client: the narrow contract the service needs from the hosted
//! relational backend.
//!
//! `AppState` holds an `Arc<dyn Store>`: `PgStore` when `DATABASE_URL` is set,
//! `UnconfiguredStore` otherwise.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::questions::Question;
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::models::engagement::EmailEngagement;
use crate::models::token::DownloadToken;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Backend is not configured")]
    Unconfigured,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Active questions, normalized and in display order.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, StoreError>;

    async fn get_assessment(&self, id: Uuid) -> Result<Option<AssessmentRecord>, StoreError>;

    /// Newest first.
    async fn list_assessments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<AssessmentRecord>, StoreError>;

    async fn insert_token(&self, token: &DownloadToken) -> Result<(), StoreError>;

    async fn find_active_token(&self, token: &str) -> Result<Option<DownloadToken>, StoreError>;

    /// Increments the download counter and stamps the download time.
    async fn record_download(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<DownloadToken, StoreError>;

    /// Returns false when no active token matched.
    async fn deactivate_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Deactivates every active token whose expiry is before `now`.
    async fn deactivate_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn insert_engagement(&self, engagement: &EmailEngagement) -> Result<(), StoreError>;

    /// Sets `opened_at` only if it is still unset. Returns whether a row changed.
    async fn mark_opened(&self, tracking_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Sets `clicked_at` only if it is still unset. Returns whether a row changed.
    async fn mark_clicked(&self, tracking_id: &str, at: DateTime<Utc>)
        -> Result<bool, StoreError>;

    async fn count_emails_sent_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn is_admin(&self, email: &str) -> Result<bool, StoreError>;
}

/// Stand-in used when no backend is configured. Every call fails with
/// `StoreError::Unconfigured`, which the HTTP layer maps to 503.
pub struct UnconfiguredStore;

#[async_trait]
impl Store for UnconfiguredStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn insert_assessment(&self, _new: NewAssessment) -> Result<AssessmentRecord, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn get_assessment(&self, _id: Uuid) -> Result<Option<AssessmentRecord>, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn list_assessments_by_email(
        &self,
        _email: &str,
    ) -> Result<Vec<AssessmentRecord>, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn insert_token(&self, _token: &DownloadToken) -> Result<(), StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn find_active_token(&self, _token: &str) -> Result<Option<DownloadToken>, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn record_download(
        &self,
        _token: &str,
        _at: DateTime<Utc>,
    ) -> Result<DownloadToken, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn deactivate_token(&self, _token: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn deactivate_expired_tokens(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn insert_engagement(&self, _engagement: &EmailEngagement) -> Result<(), StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn mark_opened(&self, _tracking_id: &str, _at: DateTime<Utc>) -> Result<bool, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn mark_clicked(
        &self,
        _tracking_id: &str,
        _at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn count_emails_sent_since(&self, _since: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Unconfigured)
    }

    async fn is_admin(&self, _email: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unconfigured)
    }
}
