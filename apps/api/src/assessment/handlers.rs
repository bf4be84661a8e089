use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::assessment::advice::{generate_advice, Advice};
use crate::assessment::questions::{group_by_dimension, Question};
use crate::assessment::scoring::{score_answers, MAX_SCORE};
use crate::assessment::Dimension;
use crate::errors::AppError;
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::state::AppState;

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
    pub by_dimension: BTreeMap<Dimension, Vec<Question>>,
}

/// GET /api/questions
pub async fn handle_list_questions(
    State(state): State<AppState>,
) -> Result<Json<QuestionsResponse>, AppError> {
    let questions = state.store.list_questions().await?;
    let by_dimension = group_by_dimension(&questions);
    Ok(Json(QuestionsResponse {
        questions,
        by_dimension,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAssessmentRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    /// Question id → chosen option index.
    pub answers: HashMap<String, usize>,
}

/// A stored result together with advice regenerated from its scores.
#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub scores: BTreeMap<Dimension, f64>,
    pub total_score: f64,
    pub max_score: f64,
    pub advice: Advice,
    pub completed_at: DateTime<Utc>,
}

impl From<AssessmentRecord> for AssessmentResponse {
    fn from(record: AssessmentRecord) -> Self {
        let advice = generate_advice(&record.scores, record.total_score);
        AssessmentResponse {
            id: record.id,
            name: record.name,
            email: record.email,
            company: record.company,
            scores: record.scores,
            total_score: record.total_score,
            max_score: MAX_SCORE,
            advice,
            completed_at: record.completed_at,
        }
    }
}

impl SubmitAssessmentRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if self.email.trim().parse::<lettre::Address>().is_err() {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                self.email.trim()
            )));
        }
        if self.answers.is_empty() {
            return Err(AppError::Validation(
                "at least one answer is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// POST /api/assessments
pub async fn handle_submit_assessment(
    State(state): State<AppState>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<(StatusCode, Json<AssessmentResponse>), AppError> {
    req.validate()?;

    let questions = state.store.list_questions().await?;
    let card = score_answers(&questions, &req.answers, &state.scoring)?;

    let record = state
        .store
        .insert_assessment(NewAssessment {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            company: req
                .company
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            scores: card.scores,
            total_score: card.total,
            completed_at: state.clock.now(),
        })
        .await?;

    info!(
        assessment_id = %record.id,
        total_score = record.total_score,
        answered = card.answered,
        "Assessment completed"
    );

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/assessments/:id
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let record = state
        .store
        .get_assessment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {id} not found")))?;
    Ok(Json(record.into()))
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// GET /api/assessments?email=
pub async fn handle_list_assessments(
    State(state): State<AppState>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<Vec<AssessmentResponse>>, AppError> {
    let email = params.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    let records = state.store.list_assessments_by_email(&email).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
