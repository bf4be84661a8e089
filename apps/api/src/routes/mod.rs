pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::admin;
use crate::assessment::handlers as assessment;
use crate::report::handlers as report;
use crate::state::AppState;
use crate::tracking;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment
        .route("/api/questions", get(assessment::handle_list_questions))
        .route(
            "/api/assessments",
            get(assessment::handle_list_assessments).post(assessment::handle_submit_assessment),
        )
        .route("/api/assessments/:id", get(assessment::handle_get_assessment))
        // Report delivery
        .route("/api/reports/pdf", post(report::handle_generate_pdf))
        .route("/api/reports/link", post(report::handle_create_link))
        .route("/api/reports/email", post(report::handle_email_report))
        .route("/api/download/pdf/:token", get(report::handle_download))
        // Email tracking
        .route("/api/email/track/open", get(tracking::handle_open))
        .route("/api/email/track/click", get(tracking::handle_click))
        // Admin
        .route(
            "/api/admin/tokens/cleanup",
            post(admin::handle_cleanup_tokens),
        )
        .route("/api/admin/tokens/:token", delete(admin::handle_revoke_token))
        .with_state(state)
}
