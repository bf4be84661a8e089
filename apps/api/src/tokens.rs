//! Download tokens gating PDF report retrieval.
//!
//! Lifecycle: `active` → `expired` (checked lazily on validation) or
//! `active` → `revoked` (admin action). Both end states are stored as
//! `is_active = false`. The download counter is informational; there is no
//! download limit inside the validity window.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::token::DownloadToken;
use crate::store::{Store, StoreError};

pub const TOKEN_VALIDITY_DAYS: i64 = 7;
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid download token")]
    Invalid,

    #[error("Download token has expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

/// 256 bits from the OS-seeded thread RNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn download_url(base_url: &str, token: &str) -> String {
    format!("{}/api/download/pdf/{token}", base_url.trim_end_matches('/'))
}

pub async fn issue_token(
    store: &dyn Store,
    clock: &dyn Clock,
    base_url: &str,
    assessment_id: Uuid,
    email: &str,
) -> Result<IssuedToken, StoreError> {
    let now = clock.now();
    let row = DownloadToken {
        token: generate_token(),
        assessment_id,
        email: email.to_string(),
        expires_at: now + Duration::days(TOKEN_VALIDITY_DAYS),
        is_active: true,
        download_count: 0,
        last_downloaded_at: None,
        created_at: now,
    };
    store.insert_token(&row).await?;

    info!(%assessment_id, expires_at = %row.expires_at, "Issued download token");

    Ok(IssuedToken {
        download_url: download_url(base_url, &row.token),
        expires_at: row.expires_at,
        token: row.token,
    })
}

/// Checks that a token is active and unexpired without consuming it.
///
/// An expired token is flipped inactive as a side effect of the failed check.
pub async fn validate_token(
    store: &dyn Store,
    clock: &dyn Clock,
    token: &str,
) -> Result<DownloadToken, TokenError> {
    let row = store
        .find_active_token(token)
        .await?
        .ok_or(TokenError::Invalid)?;

    if row.expires_at < clock.now() {
        if let Err(e) = store.deactivate_token(token).await {
            warn!(assessment_id = %row.assessment_id, "Failed to deactivate expired token: {e}");
        }
        return Err(TokenError::Expired);
    }

    Ok(row)
}

/// Counts a completed download. Call only once the report has been produced.
/// Concurrent downloads may race on the counter; last write wins.
pub async fn record_download(
    store: &dyn Store,
    clock: &dyn Clock,
    token: &str,
) -> Result<DownloadToken, StoreError> {
    store.record_download(token, clock.now()).await
}

/// Administrative revocation, regardless of expiry. Returns false when the
/// token is unknown or already inactive.
pub async fn revoke_token(store: &dyn Store, token: &str) -> Result<bool, StoreError> {
    let revoked = store.deactivate_token(token).await?;
    if revoked {
        info!("Revoked download token");
    }
    Ok(revoked)
}

/// Bulk-deactivates tokens past their expiry that are still active.
pub async fn cleanup_expired(store: &dyn Store, clock: &dyn Clock) -> Result<u64, StoreError> {
    let count = store.deactivate_expired_tokens(clock.now()).await?;
    info!(count, "Deactivated expired download tokens");
    Ok(count)
}
