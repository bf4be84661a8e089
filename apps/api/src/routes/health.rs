use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;
use crate::store::StoreError;

/// GET /health
/// Returns service status, version and backend reachability. Always 200.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let store = match state.store.ping().await {
        Ok(()) => "ok",
        Err(StoreError::Unconfigured) => "unconfigured",
        Err(e) => {
            warn!("Health check store ping failed: {e}");
            "error"
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ccpm-api",
        "store": store
    }))
}
