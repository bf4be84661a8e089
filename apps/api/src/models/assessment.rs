use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::Dimension;

/// A completed assessment. Only scores are stored; advice is derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub scores: BTreeMap<Dimension, f64>,
    pub total_score: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub scores: BTreeMap<Dimension, f64>,
    pub total_score: f64,
    pub completed_at: DateTime<Utc>,
}
