use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DownloadToken {
    pub token: String,
    pub assessment_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub download_count: i32,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
