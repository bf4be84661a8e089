use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::assessment::questions::{normalize_questions, Question, RawQuestion};
use crate::assessment::Dimension;
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::models::engagement::EmailEngagement;
use crate::models::token::DownloadToken;
use crate::store::{Store, StoreError};

/// Store backed by the hosted Postgres database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Scores are stored one column per dimension.
#[derive(Debug, FromRow)]
struct AssessmentRow {
    id: Uuid,
    name: String,
    email: String,
    company: Option<String>,
    time_management_score: f64,
    resource_coordination_score: f64,
    risk_control_score: f64,
    team_collaboration_score: f64,
    total_score: f64,
    completed_at: DateTime<Utc>,
}

impl From<AssessmentRow> for AssessmentRecord {
    fn from(row: AssessmentRow) -> Self {
        let scores = BTreeMap::from([
            (Dimension::TimeManagement, row.time_management_score),
            (Dimension::ResourceCoordination, row.resource_coordination_score),
            (Dimension::RiskControl, row.risk_control_score),
            (Dimension::TeamCollaboration, row.team_collaboration_score),
        ]);
        AssessmentRecord {
            id: row.id,
            name: row.name,
            email: row.email,
            company: row.company,
            scores,
            total_score: row.total_score,
            completed_at: row.completed_at,
        }
    }
}

const ASSESSMENT_COLUMNS: &str = "id, name, email, company, time_management_score, \
     resource_coordination_score, risk_control_score, team_collaboration_score, \
     total_score, completed_at";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let rows: Vec<RawQuestion> = sqlx::query_as(
            r#"
            SELECT id, question AS text, dimension, options
            FROM assessment_questions
            WHERE is_active
            ORDER BY sort_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(normalize_questions(rows))
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, StoreError> {
        let id = Uuid::new_v4();
        let score = |d: Dimension| new.scores.get(&d).copied().unwrap_or(0.0);

        sqlx::query(
            r#"
            INSERT INTO assessment_results
                (id, name, email, company, time_management_score,
                 resource_coordination_score, risk_control_score,
                 team_collaboration_score, total_score, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.company)
        .bind(score(Dimension::TimeManagement))
        .bind(score(Dimension::ResourceCoordination))
        .bind(score(Dimension::RiskControl))
        .bind(score(Dimension::TeamCollaboration))
        .bind(new.total_score)
        .bind(new.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(AssessmentRecord {
            id,
            name: new.name,
            email: new.email,
            company: new.company,
            scores: new.scores,
            total_score: new.total_score,
            completed_at: new.completed_at,
        })
    }

    async fn get_assessment(&self, id: Uuid) -> Result<Option<AssessmentRecord>, StoreError> {
        let row: Option<AssessmentRow> = sqlx::query_as(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessment_results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AssessmentRecord::from))
    }

    async fn list_assessments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<AssessmentRecord>, StoreError> {
        let rows: Vec<AssessmentRow> = sqlx::query_as(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessment_results \
             WHERE lower(email) = lower($1) ORDER BY completed_at DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AssessmentRecord::from).collect())
    }

    async fn insert_token(&self, token: &DownloadToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO download_tokens
                (token, assessment_id, email, expires_at, is_active,
                 download_count, last_downloaded_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&token.token)
        .bind(token.assessment_id)
        .bind(&token.email)
        .bind(token.expires_at)
        .bind(token.is_active)
        .bind(token.download_count)
        .bind(token.last_downloaded_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_token(&self, token: &str) -> Result<Option<DownloadToken>, StoreError> {
        let row = sqlx::query_as::<_, DownloadToken>(
            "SELECT * FROM download_tokens WHERE token = $1 AND is_active",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_download(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<DownloadToken, StoreError> {
        sqlx::query_as::<_, DownloadToken>(
            r#"
            UPDATE download_tokens
            SET download_count = download_count + 1, last_downloaded_at = $2
            WHERE token = $1
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Download token".to_string()))
    }

    async fn deactivate_token(&self, token: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE download_tokens SET is_active = false WHERE token = $1 AND is_active")
                .bind(token)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE download_tokens SET is_active = false WHERE is_active AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_engagement(&self, engagement: &EmailEngagement) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO email_engagements
                (tracking_id, assessment_id, recipient, subject, sent_at, opened_at, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&engagement.tracking_id)
        .bind(engagement.assessment_id)
        .bind(&engagement.recipient)
        .bind(&engagement.subject)
        .bind(engagement.sent_at)
        .bind(engagement.opened_at)
        .bind(engagement.clicked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_opened(&self, tracking_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        // Gated on NULL: a replayed pixel hit is a no-op.
        let result = sqlx::query(
            "UPDATE email_engagements SET opened_at = $2 WHERE tracking_id = $1 AND opened_at IS NULL",
        )
        .bind(tracking_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_clicked(&self, tracking_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE email_engagements SET clicked_at = $2 WHERE tracking_id = $1 AND clicked_at IS NULL",
        )
        .bind(tracking_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_emails_sent_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM email_engagements WHERE sent_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn is_admin(&self, email: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM admin_users WHERE lower(email) = lower($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
