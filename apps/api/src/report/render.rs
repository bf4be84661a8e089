use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use crate::assessment::advice::Advice;
use crate::assessment::scoring::MAX_SCORE;
use crate::assessment::Dimension;
use crate::models::assessment::AssessmentRecord;
use crate::report::engine::RenderError;

const REPORT_TEMPLATE_NAME: &str = "report.html";
const REPORT_TEMPLATE: &str = include_str!("templates/report.html.tera");

/// Visual band for a score, applied identically to the total and to each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ScoreBand::Excellent
        } else if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 50.0 {
            ScoreBand::Average
        } else {
            ScoreBand::Poor
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Average => "average",
            ScoreBand::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionSection {
    pub key: &'static str,
    pub label: &'static str,
    pub score: f64,
    pub max_score: f64,
    pub css_class: &'static str,
    pub advice: String,
}

/// Everything the report template interpolates.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub respondent_name: String,
    pub respondent_email: String,
    pub company: Option<String>,
    pub total_score: f64,
    pub max_score: f64,
    pub total_class: &'static str,
    pub level: &'static str,
    pub level_description: String,
    pub overall_advice: String,
    pub dimensions: Vec<DimensionSection>,
    pub next_steps: Vec<String>,
    pub completed_at: String,
}

impl ReportData {
    pub fn new(record: &AssessmentRecord, advice: &Advice) -> Self {
        let dimensions = Dimension::ALL
            .into_iter()
            .map(|d| {
                let score = record.scores.get(&d).copied().unwrap_or(0.0);
                DimensionSection {
                    key: d.as_str(),
                    label: d.label(),
                    score,
                    max_score: MAX_SCORE,
                    css_class: ScoreBand::from_score(score).css_class(),
                    advice: advice.dimensions.get(&d).cloned().unwrap_or_default(),
                }
            })
            .collect();

        Self {
            respondent_name: record.name.clone(),
            respondent_email: record.email.clone(),
            company: record.company.clone(),
            total_score: record.total_score,
            max_score: MAX_SCORE,
            total_class: ScoreBand::from_score(record.total_score).css_class(),
            level: advice.level.as_str(),
            level_description: advice.level_description.clone(),
            overall_advice: advice.overall.clone(),
            dimensions,
            next_steps: advice.next_steps.clone(),
            completed_at: format_date(record.completed_at),
        }
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Renders the report HTML. The `.html` template name turns on Tera's
/// autoescaping, so respondent-supplied text is escaped.
pub fn render_report_html(data: &ReportData) -> Result<String, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_template(REPORT_TEMPLATE_NAME, REPORT_TEMPLATE)?;
    let context = Context::from_serialize(data)?;
    Ok(tera.render(REPORT_TEMPLATE_NAME, &context)?)
}
