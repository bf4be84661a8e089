use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::tokens::{cleanup_expired, revoke_token};

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deactivated: u64,
}

/// DELETE /api/admin/tokens/:token
pub async fn handle_revoke_token(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(token): Path<String>,
) -> Result<StatusCode, AppError> {
    if !revoke_token(state.store.as_ref(), &token).await? {
        return Err(AppError::NotFound(
            "No active download token matches".to_string(),
        ));
    }
    info!(admin = %admin.email, "Download token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/tokens/cleanup
pub async fn handle_cleanup_tokens(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<CleanupResponse>, AppError> {
    let deactivated = cleanup_expired(state.store.as_ref(), state.clock.as_ref()).await?;
    info!(admin = %admin.email, deactivated, "Expired download tokens cleaned up");
    Ok(Json(CleanupResponse { deactivated }))
}
