use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::check_email_quota;
use crate::assessment::advice::generate_advice;
use crate::errors::AppError;
use crate::mail::templates::{report_email, ReportEmail, REPORT_SUBJECT};
use crate::models::assessment::AssessmentRecord;
use crate::models::engagement::EmailEngagement;
use crate::report::render::{render_report_html, ReportData};
use crate::state::AppState;
use crate::tokens::{issue_token, record_download, validate_token, IssuedToken};
use crate::tracking::{click_url, open_pixel_url};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub assessment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReportEmailResponse {
    pub sent: bool,
    pub tracking_id: String,
    pub expires_at: DateTime<Utc>,
}

async fn load_assessment(state: &AppState, id: Uuid) -> Result<AssessmentRecord, AppError> {
    state
        .store
        .get_assessment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {id} not found")))
}

/// Renders the full PDF report for a stored result.
async fn render_pdf(state: &AppState, record: &AssessmentRecord) -> Result<Vec<u8>, AppError> {
    let advice = generate_advice(&record.scores, record.total_score);
    let html = render_report_html(&ReportData::new(record, &advice))?;

    match state.pdf.html_to_pdf(&html).await {
        Ok(pdf) => {
            info!(
                assessment_id = %record.id,
                bytes = pdf.len(),
                "Report PDF generated"
            );
            Ok(pdf)
        }
        Err(e) => {
            error!(
                assessment_id = %record.id,
                launch_mode = %state.pdf.launch_mode(),
                "Report PDF generation failed: {e}"
            );
            Err(e.into())
        }
    }
}

fn pdf_response(assessment_id: Uuid, pdf: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"ccpm360-assessment-{assessment_id}.pdf\""),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        pdf,
    )
        .into_response()
}

/// POST /api/reports/pdf
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Response, AppError> {
    let record = load_assessment(&state, req.assessment_id).await?;
    let pdf = render_pdf(&state, &record).await?;
    Ok(pdf_response(record.id, pdf))
}

/// POST /api/reports/link
pub async fn handle_create_link(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    let record = load_assessment(&state, req.assessment_id).await?;
    let issued = issue_token(
        state.store.as_ref(),
        state.clock.as_ref(),
        &state.config.public_base_url,
        record.id,
        &record.email,
    )
    .await?;
    Ok(Json(issued))
}

/// POST /api/reports/email
pub async fn handle_email_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportEmailResponse>, AppError> {
    let record = load_assessment(&state, req.assessment_id).await?;
    let base_url = &state.config.public_base_url;

    let issued = issue_token(
        state.store.as_ref(),
        state.clock.as_ref(),
        base_url,
        record.id,
        &record.email,
    )
    .await?;

    let tracking_id = Uuid::new_v4().to_string();
    state
        .store
        .insert_engagement(&EmailEngagement {
            tracking_id: tracking_id.clone(),
            assessment_id: Some(record.id),
            recipient: record.email.clone(),
            subject: REPORT_SUBJECT.to_string(),
            sent_at: state.clock.now(),
            opened_at: None,
            clicked_at: None,
        })
        .await?;

    let level = generate_advice(&record.scores, record.total_score).level;
    let link = click_url(base_url, &tracking_id, &issued.download_url)?;
    let pixel = open_pixel_url(base_url, &tracking_id)?;
    let email = report_email(&ReportEmail {
        to: &record.email,
        name: &record.name,
        total_score: record.total_score,
        level: level.as_str(),
        link: &link,
        pixel: &pixel,
        expires_at: issued.expires_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    })
    .map_err(|e| AppError::Internal(anyhow::anyhow!("report email template failed: {e}")))?;

    let sent = state.mailer.send(&email).await;
    if sent {
        info!(assessment_id = %record.id, tracking_id = %tracking_id, "Report email sent");
        check_email_quota(&state).await;
    } else {
        warn!(assessment_id = %record.id, tracking_id = %tracking_id, "Report email was not sent");
    }

    Ok(Json(ReportEmailResponse {
        sent,
        tracking_id,
        expires_at: issued.expires_at,
    }))
}

/// GET /api/download/pdf/:token
pub async fn handle_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let row = validate_token(state.store.as_ref(), state.clock.as_ref(), &token).await?;
    let record = load_assessment(&state, row.assessment_id).await?;
    let pdf = render_pdf(&state, &record).await?;
    let row = record_download(state.store.as_ref(), state.clock.as_ref(), &token).await?;
    info!(
        assessment_id = %record.id,
        download_count = row.download_count,
        "Report downloaded via link"
    );
    Ok(pdf_response(record.id, pdf))
}
