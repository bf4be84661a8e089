use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::questions::{Question, QuestionOption};
use crate::assessment::Dimension;

pub const MAX_SCORE: f64 = 100.0;

/// Point table supplied as configuration: points per option position and the
/// weight of each dimension in the total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringTable {
    pub option_points: Vec<f64>,
    pub weights: BTreeMap<Dimension, f64>,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            option_points: vec![100.0, 75.0, 50.0, 25.0],
            weights: Dimension::ALL.into_iter().map(|d| (d, 0.25)).collect(),
        }
    }
}

impl ScoringTable {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring table {}", path.display()))?;
        let table: ScoringTable = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scoring table {}", path.display()))?;
        table.validated()
    }

    /// Clamps option points to 0..=100 and normalizes weights to sum to 1.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        if self.option_points.is_empty() {
            bail!("scoring table needs at least one option point value");
        }
        if self.option_points.iter().any(|p| !p.is_finite()) {
            bail!("option point values must be finite numbers");
        }
        for points in &mut self.option_points {
            *points = points.clamp(0.0, MAX_SCORE);
        }

        for dimension in Dimension::ALL {
            match self.weights.get(&dimension) {
                Some(w) if w.is_finite() && *w >= 0.0 => {}
                Some(w) => bail!("weight for {dimension} must be a non-negative number, got {w}"),
                None => bail!("missing weight for {dimension}"),
            }
        }
        let sum: f64 = self.weights.values().sum();
        if sum <= 0.0 {
            bail!("dimension weights must not all be zero");
        }
        for weight in self.weights.values_mut() {
            *weight /= sum;
        }
        Ok(self)
    }

    fn points_for(&self, option: &QuestionOption) -> f64 {
        let points = option.score.unwrap_or_else(|| {
            self.option_points
                .get(option.index)
                .or(self.option_points.last())
                .copied()
                .unwrap_or(0.0)
        });
        if points.is_finite() {
            points.clamp(0.0, MAX_SCORE)
        } else {
            0.0
        }
    }

    fn weight(&self, dimension: Dimension) -> f64 {
        self.weights.get(&dimension).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("No answers submitted")]
    NoAnswers,

    #[error("Unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("Question '{question_id}' has no option {index}")]
    UnknownOption { question_id: String, index: usize },
}

/// Scores for one submission. `scores` are per-dimension percentages (0–100),
/// `contributions` their weighted share of `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub scores: BTreeMap<Dimension, f64>,
    pub contributions: BTreeMap<Dimension, f64>,
    pub total: f64,
    pub answered: usize,
}

/// Maps answers (question id → chosen option index) to dimension and total scores.
///
/// A dimension's score is the mean of its chosen option points, rounded to one
/// decimal; a dimension without answers scores 0. The total is the sum of the
/// weighted dimension scores.
pub fn score_answers(
    questions: &[Question],
    answers: &HashMap<String, usize>,
    table: &ScoringTable,
) -> Result<ScoreCard, ScoringError> {
    if answers.is_empty() {
        return Err(ScoringError::NoAnswers);
    }

    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let mut sums: BTreeMap<Dimension, (f64, usize)> = BTreeMap::new();

    // Sorted so the first reported error does not depend on hash order.
    let mut ordered: Vec<(&String, &usize)> = answers.iter().collect();
    ordered.sort();

    for (question_id, &index) in ordered {
        let question = by_id
            .get(question_id.as_str())
            .ok_or_else(|| ScoringError::UnknownQuestion(question_id.clone()))?;
        let option = question
            .option(index)
            .ok_or_else(|| ScoringError::UnknownOption {
                question_id: question_id.clone(),
                index,
            })?;
        let entry = sums.entry(question.dimension).or_insert((0.0, 0));
        entry.0 += table.points_for(option);
        entry.1 += 1;
    }

    let scores: BTreeMap<Dimension, f64> = Dimension::ALL
        .into_iter()
        .map(|d| {
            let score = match sums.get(&d) {
                Some((sum, count)) if *count > 0 => round1(sum / *count as f64),
                _ => 0.0,
            };
            (d, score)
        })
        .collect();

    let contributions: BTreeMap<Dimension, f64> = scores
        .iter()
        .map(|(d, score)| (*d, score * table.weight(*d)))
        .collect();
    let total: f64 = contributions.values().sum();

    Ok(ScoreCard {
        scores,
        contributions,
        total: round1(total.clamp(0.0, MAX_SCORE)),
        answered: answers.len(),
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
