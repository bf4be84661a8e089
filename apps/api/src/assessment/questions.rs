//! Question normalization.
//!
//! Stored question rows carry `options` in one of two shapes: an ordered list
//! (of strings or `{ text | label, score? }` objects) or an object keyed by the
//! letters `A`–`D`. Both are decoded into [`RawOptions`] at the store boundary
//! and immediately flattened into `Vec<QuestionOption>`; nothing past the store
//! ever sees the raw shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::assessment::Dimension;

/// Keys of the object form, in the order they map to option positions.
const OBJECT_OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Position in the original option ordering, before empty entries are dropped.
    pub index: usize,
    pub text: String,
    /// Per-option point override; the scoring table applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub dimension: Dimension,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn option(&self, index: usize) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.index == index)
    }
}

/// Question row as stored, before normalization.
#[derive(Debug, Clone, Deserialize, sqlx::FromRow)]
pub struct RawQuestion {
    pub id: String,
    pub text: String,
    pub dimension: String,
    pub options: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawOptions {
    List(Vec<Value>),
    Object(Map<String, Value>),
}

impl RawOptions {
    /// Decodes a stored JSON value. Anything that is neither a list nor an object
    /// (including null) is treated as an empty list.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or(RawOptions::List(Vec::new()))
    }

    pub fn normalize(&self) -> Vec<QuestionOption> {
        match self {
            RawOptions::List(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| option_from_value(index, item))
                .collect(),
            RawOptions::Object(map) => OBJECT_OPTION_KEYS
                .iter()
                .enumerate()
                .filter_map(|(index, key)| {
                    let value = map
                        .get(*key)
                        .or_else(|| map.get(&key.to_ascii_lowercase()))?;
                    option_from_value(index, value)
                })
                .collect(),
        }
    }
}

fn option_from_value(index: usize, value: &Value) -> Option<QuestionOption> {
    let (text, score) = match value {
        Value::String(s) => (s.as_str(), None),
        Value::Object(obj) => {
            let text = obj
                .get("text")
                .or_else(|| obj.get("label"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let score = obj.get("score").and_then(Value::as_f64);
            (text, score)
        }
        _ => return None,
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(QuestionOption {
        index,
        text: text.to_string(),
        score,
    })
}

/// Normalizes stored rows into questions. Rows with an unknown dimension or
/// without a single usable option cannot be answered and are skipped.
pub fn normalize_questions(rows: Vec<RawQuestion>) -> Vec<Question> {
    rows.into_iter()
        .filter_map(|row| {
            let dimension = match row.dimension.parse::<Dimension>() {
                Ok(d) => d,
                Err(e) => {
                    warn!(question_id = %row.id, "Skipping question: {e}");
                    return None;
                }
            };
            let options = RawOptions::from_value(row.options).normalize();
            if options.is_empty() {
                warn!(question_id = %row.id, "Skipping question without usable options");
                return None;
            }
            Some(Question {
                id: row.id,
                text: row.text.trim().to_string(),
                dimension,
                options,
            })
        })
        .collect()
}

/// Groups questions by dimension for quiz pagination. Every dimension is
/// present, even when it has no questions.
pub fn group_by_dimension(questions: &[Question]) -> BTreeMap<Dimension, Vec<Question>> {
    let mut groups: BTreeMap<Dimension, Vec<Question>> =
        Dimension::ALL.into_iter().map(|d| (d, Vec::new())).collect();
    for question in questions {
        groups
            .entry(question.dimension)
            .or_default()
            .push(question.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn opt(index: usize, text: &str) -> QuestionOption {
        QuestionOption {
            index,
            text: text.to_string(),
            score: None,
        }
    }

    #[test]
    fn test_object_form_keeps_original_positions() {
        let raw = RawOptions::from_value(json!({ "A": "x", "B": "", "C": "y" }));
        assert_eq!(raw.normalize(), vec![opt(0, "x"), opt(2, "y")]);
    }

    #[test]
    fn test_object_form_serializes_without_score() {
        let raw = RawOptions::from_value(json!({ "A": "x", "B": "", "C": "y", "D": null }));
        let normalized = serde_json::to_value(raw.normalize()).unwrap();
        assert_eq!(
            normalized,
            json!([{ "index": 0, "text": "x" }, { "index": 2, "text": "y" }])
        );
    }

    #[test]
    fn test_object_form_ignores_key_order_and_unknown_keys() {
        let raw = RawOptions::from_value(json!({ "d": "last", "E": "extra", "a": " first " }));
        assert_eq!(raw.normalize(), vec![opt(0, "first"), opt(3, "last")]);
    }

    #[test]
    fn test_list_form_drops_blank_entries() {
        let raw = RawOptions::from_value(json!(["  Always  ", "   ", null, "Rarely"]));
        assert_eq!(raw.normalize(), vec![opt(0, "Always"), opt(3, "Rarely")]);
    }

    #[test]
    fn test_list_of_objects_with_scores() {
        let raw = RawOptions::from_value(json!([
            { "text": "Buffers are sized per chain", "score": 90 },
            { "label": "We pad each task" },
            { "text": "" }
        ]));
        let normalized = raw.normalize();
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].score, Some(90.0));
        assert_eq!(normalized[1].text, "We pad each task");
        assert_eq!(normalized[1].score, None);
    }

    #[test]
    fn test_non_collection_options_are_empty() {
        assert!(RawOptions::from_value(Value::Null).normalize().is_empty());
        assert!(RawOptions::from_value(json!("A")).normalize().is_empty());
    }

    #[test]
    fn test_normalize_questions_skips_unusable_rows() {
        let rows = vec![
            RawQuestion {
                id: "q1".into(),
                text: " How do you plan? ".into(),
                dimension: "time_management".into(),
                options: json!(["Critical chain", "Gantt only"]),
            },
            RawQuestion {
                id: "q2".into(),
                text: "Unknown".into(),
                dimension: "budgeting".into(),
                options: json!(["a"]),
            },
            RawQuestion {
                id: "q3".into(),
                text: "Empty".into(),
                dimension: "risk_control".into(),
                options: json!({ "A": "", "B": "  " }),
            },
        ];
        let questions = normalize_questions(rows);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "How do you plan?");
        assert_eq!(questions[0].dimension, Dimension::TimeManagement);
    }

    #[test]
    fn test_group_by_dimension_has_every_dimension() {
        let questions = vec![Question {
            id: "q1".into(),
            text: "t".into(),
            dimension: Dimension::RiskControl,
            options: vec![opt(0, "a")],
        }];
        let groups = group_by_dimension(&questions);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[&Dimension::RiskControl].len(), 1);
        assert!(groups[&Dimension::TimeManagement].is_empty());
    }
}
