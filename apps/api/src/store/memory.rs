//! In-memory `Store` used by the handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::assessment::questions::{normalize_questions, Question, RawQuestion};
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::models::engagement::EmailEngagement;
use crate::models::token::DownloadToken;
use crate::store::{Store, StoreError};

#[derive(Default)]
struct Inner {
    questions: Vec<Question>,
    assessments: Vec<AssessmentRecord>,
    tokens: HashMap<String, DownloadToken>,
    engagements: HashMap<String, EmailEngagement>,
    admins: Vec<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn with_questions(rows: Vec<RawQuestion>) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().questions = normalize_questions(rows);
        store
    }

    pub fn add_admin(&self, email: &str) {
        self.inner.lock().unwrap().admins.push(email.to_lowercase());
    }

    pub fn token(&self, token: &str) -> Option<DownloadToken> {
        self.inner.lock().unwrap().tokens.get(token).cloned()
    }

    pub fn tokens(&self) -> Vec<DownloadToken> {
        self.inner.lock().unwrap().tokens.values().cloned().collect()
    }

    pub fn engagement(&self, tracking_id: &str) -> Option<EmailEngagement> {
        self.inner
            .lock()
            .unwrap()
            .engagements
            .get(tracking_id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.inner.lock().unwrap().questions.clone())
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, StoreError> {
        let record = AssessmentRecord {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            company: new.company,
            scores: new.scores,
            total_score: new.total_score,
            completed_at: new.completed_at,
        };
        self.inner.lock().unwrap().assessments.push(record.clone());
        Ok(record)
    }

    async fn get_assessment(&self, id: Uuid) -> Result<Option<AssessmentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.assessments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_assessments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<AssessmentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<AssessmentRecord> = inner
            .assessments
            .iter()
            .filter(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }

    async fn insert_token(&self, token: &DownloadToken) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_active_token(&self, token: &str) -> Result<Option<DownloadToken>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tokens.get(token).filter(|t| t.is_active).cloned())
    }

    async fn record_download(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<DownloadToken, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .tokens
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound("Download token".to_string()))?;
        row.download_count += 1;
        row.last_downloaded_at = Some(at);
        Ok(row.clone())
    }

    async fn deactivate_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.tokens.get_mut(token) {
            Some(row) if row.is_active => {
                row.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for row in inner.tokens.values_mut() {
            if row.is_active && row.expires_at < now {
                row.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_engagement(&self, engagement: &EmailEngagement) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .engagements
            .insert(engagement.tracking_id.clone(), engagement.clone());
        Ok(())
    }

    async fn mark_opened(&self, tracking_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.engagements.get_mut(tracking_id) {
            Some(row) if row.opened_at.is_none() => {
                row.opened_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_clicked(&self, tracking_id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.engagements.get_mut(tracking_id) {
            Some(row) if row.clicked_at.is_none() => {
                row.clicked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_emails_sent_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .engagements
            .values()
            .filter(|e| e.sent_at >= since)
            .count() as u64)
    }

    async fn is_admin(&self, email: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.admins.iter().any(|a| a.eq_ignore_ascii_case(email)))
    }
}
