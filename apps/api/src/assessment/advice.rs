//! Advice generation: maps scores to a tiered narrative.
//!
//! Pure and deterministic: identical scores always yield byte-identical advice,
//! which is why only scores are persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assessment::Dimension;

/// Total score at or above which the respondent is `Advanced`.
pub const ADVANCED_THRESHOLD: f64 = 85.0;
/// Total score at or above which the respondent is `Intermediate`.
pub const INTERMEDIATE_THRESHOLD: f64 = 65.0;
/// Dimension scores below this get a next-step callout for the weakest one.
pub const CALLOUT_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn from_total(total: f64) -> Self {
        let total = sanitize(total);
        if total >= ADVANCED_THRESHOLD {
            Level::Advanced
        } else if total >= INTERMEDIATE_THRESHOLD {
            Level::Intermediate
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Level::Advanced => {
                "Advanced: your team applies critical chain practices consistently and manages flow at the portfolio level."
            }
            Level::Intermediate => {
                "Intermediate: the fundamentals are in place, but buffers and priorities are not yet managed consistently."
            }
            Level::Beginner => {
                "Beginner: projects are still driven by task deadlines and local estimates rather than the critical chain."
            }
        }
    }

    fn overall_advice(self) -> &'static str {
        match self {
            Level::Advanced => {
                "Your project management maturity is high. Keep the discipline of buffer management, share your practices across the portfolio, and use multi-project pipelining to raise throughput further."
            }
            Level::Intermediate => {
                "You have a solid base to build on. The biggest gains now come from aggregating safety margins into project buffers, reviewing buffer consumption every week, and removing bad multitasking."
            }
            Level::Beginner => {
                "There is significant room for improvement. Start by identifying the critical chain of your most important project, cutting task estimates to focused durations, and protecting the delivery date with a shared project buffer."
            }
        }
    }

    fn next_steps(self) -> [&'static str; 3] {
        match self {
            Level::Advanced => [
                "Extend buffer management to the full project portfolio and stagger project starts on the constraint resource.",
                "Coach other teams on critical chain practices to spread your operating rhythm.",
                "Track throughput and on-time delivery trends quarterly to confirm improvements hold.",
            ],
            Level::Intermediate => [
                "Replace padded task estimates with aggressive-but-possible durations and a shared project buffer.",
                "Hold a weekly buffer review using fever charts to decide where to act.",
                "Limit work in progress so key resources finish tasks before starting new ones.",
            ],
            Level::Beginner => [
                "Attend an introductory critical chain project management workshop with your core team.",
                "Map the critical chain of one pilot project, including resource dependencies.",
                "Introduce a single project buffer on the pilot and report its consumption every week.",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    NeedsWork,
    Solid,
    Strong,
}

impl Band {
    fn from_score(score: f64) -> Self {
        if score >= ADVANCED_THRESHOLD {
            Band::Strong
        } else if score >= CALLOUT_THRESHOLD {
            Band::Solid
        } else {
            Band::NeedsWork
        }
    }
}

fn dimension_advice(dimension: Dimension, band: Band) -> &'static str {
    match (dimension, band) {
        (Dimension::TimeManagement, Band::Strong) => {
            "Schedules are built around the critical chain and buffers are protected. Keep using buffer burn rates to steer priorities."
        }
        (Dimension::TimeManagement, Band::Solid) => {
            "Planning is reasonably disciplined, but safety time still hides inside individual tasks. Move it into a visible project buffer."
        }
        (Dimension::TimeManagement, Band::NeedsWork) => {
            "Deadlines are managed task by task and slip quietly. Identify the critical chain and replace padded estimates with focused durations."
        }
        (Dimension::ResourceCoordination, Band::Strong) => {
            "Key resources are synchronized across projects and rarely multitask. Use the constraint resource to pace new project starts."
        }
        (Dimension::ResourceCoordination, Band::Solid) => {
            "Resource conflicts are usually resolved, but often late. Agree on a single priority list so people know what to work on next."
        }
        (Dimension::ResourceCoordination, Band::NeedsWork) => {
            "Resources are spread across too many tasks at once. Reduce work in progress and stop bad multitasking on shared specialists."
        }
        (Dimension::RiskControl, Band::Strong) => {
            "Risks are absorbed by well-sized buffers and tracked through buffer consumption. Keep feeding lessons learned into new plans."
        }
        (Dimension::RiskControl, Band::Solid) => {
            "Risks are recognised, but responses depend on individual judgement. Use buffer zones to trigger planned recovery actions."
        }
        (Dimension::RiskControl, Band::NeedsWork) => {
            "Uncertainty is handled by firefighting. Add feeding buffers where non-critical chains join and review buffer status weekly."
        }
        (Dimension::TeamCollaboration, Band::Strong) => {
            "The team shares one view of priorities and hands work over quickly. Keep the relay-runner habit alive as the team grows."
        }
        (Dimension::TeamCollaboration, Band::Solid) => {
            "Collaboration works, but hand-offs wait on meetings and approvals. Announce task completions early so the next person is ready."
        }
        (Dimension::TeamCollaboration, Band::NeedsWork) => {
            "Teams optimise locally and information arrives late. Introduce a short daily buffer meeting focused on what blocks the chain."
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub level: Level,
    pub level_description: String,
    pub overall: String,
    pub dimensions: BTreeMap<Dimension, String>,
    pub next_steps: Vec<String>,
}

/// Builds the advice payload from per-dimension scores and the total.
/// Missing or non-finite scores count as 0.
pub fn generate_advice(scores: &BTreeMap<Dimension, f64>, total: f64) -> Advice {
    let level = Level::from_total(total);
    let score_of = |d: Dimension| sanitize(scores.get(&d).copied().unwrap_or(0.0));

    let dimensions = Dimension::ALL
        .into_iter()
        .map(|d| (d, dimension_advice(d, Band::from_score(score_of(d))).to_string()))
        .collect();

    let mut next_steps: Vec<String> = level.next_steps().iter().map(|s| s.to_string()).collect();

    // Strict comparison keeps the first dimension in canonical order on ties.
    let (weakest, weakest_score) = Dimension::ALL
        .into_iter()
        .map(|d| (d, score_of(d)))
        .fold(None, |lowest: Option<(Dimension, f64)>, (d, s)| match lowest {
            Some((_, low)) if s >= low => lowest,
            _ => Some((d, s)),
        })
        .unwrap_or((Dimension::TimeManagement, 0.0));

    if weakest_score < CALLOUT_THRESHOLD {
        next_steps.push(format!(
            "Prioritise {}: at {:.1} points it is your weakest dimension. Start your improvement plan there.",
            weakest.label(),
            weakest_score
        ));
    }

    Advice {
        level,
        level_description: level.description().to_string(),
        overall: level.overall_advice().to_string(),
        dimensions,
        next_steps,
    }
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: [f64; 4]) -> BTreeMap<Dimension, f64> {
        Dimension::ALL.into_iter().zip(values).collect()
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Level::from_total(85.0), Level::Advanced);
        assert_eq!(Level::from_total(84.9), Level::Intermediate);
        assert_eq!(Level::from_total(65.0), Level::Intermediate);
        assert_eq!(Level::from_total(64.0), Level::Beginner);
        assert_eq!(Level::from_total(f64::NAN), Level::Beginner);
    }

    #[test]
    fn test_advice_is_deterministic() {
        let s = scores([72.5, 55.0, 91.0, 68.0]);
        let a = serde_json::to_string(&generate_advice(&s, 71.6)).unwrap();
        let b = serde_json::to_string(&generate_advice(&s, 71.6)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_high_scores_have_no_callout() {
        let advice = generate_advice(&scores([96.0, 95.0, 98.0, 100.0]), 97.25);
        assert_eq!(advice.level, Level::Advanced);
        assert_eq!(advice.next_steps.len(), 3);
    }

    #[test]
    fn test_weak_time_management_gets_callout() {
        let s = scores([60.0, 90.0, 90.0, 90.0]);
        let total: f64 = s.values().map(|v| v * 0.25).sum();
        let advice = generate_advice(&s, total);
        assert_eq!(total, 82.5);
        assert_eq!(advice.level, Level::Intermediate);
        assert_eq!(advice.next_steps.len(), 4);
        assert!(advice.next_steps[3].contains("Time Management"));
    }

    #[test]
    fn test_callout_tie_picks_first_canonical_dimension() {
        let advice = generate_advice(&scores([80.0, 50.0, 90.0, 50.0]), 67.5);
        let callout = advice.next_steps.last().unwrap();
        assert!(callout.contains("Resource Coordination"), "{callout}");
        assert!(!callout.contains("Team Collaboration"));
    }

    #[test]
    fn test_callout_score_is_not_rounded_up_to_threshold() {
        let advice = generate_advice(&scores([69.6, 75.0, 80.0, 90.0]), 78.65);
        let callout = advice.next_steps.last().unwrap();
        assert!(callout.contains("at 69.6 points"), "{callout}");
    }

    #[test]
    fn test_callout_requires_strictly_below_seventy() {
        let advice = generate_advice(&scores([70.0, 75.0, 80.0, 90.0]), 78.75);
        assert_eq!(advice.next_steps.len(), 3);
    }

    #[test]
    fn test_dimension_bands() {
        let advice = generate_advice(&scores([69.9, 70.0, 84.9, 85.0]), 77.45);
        let tm = &advice.dimensions[&Dimension::TimeManagement];
        let rc = &advice.dimensions[&Dimension::ResourceCoordination];
        let rk = &advice.dimensions[&Dimension::RiskControl];
        let tc = &advice.dimensions[&Dimension::TeamCollaboration];
        assert_eq!(tm, dimension_advice(Dimension::TimeManagement, Band::NeedsWork));
        assert_eq!(rc, dimension_advice(Dimension::ResourceCoordination, Band::Solid));
        assert_eq!(rk, dimension_advice(Dimension::RiskControl, Band::Solid));
        assert_eq!(tc, dimension_advice(Dimension::TeamCollaboration, Band::Strong));
    }

    #[test]
    fn test_missing_dimension_counts_as_zero() {
        let mut s = scores([90.0, 90.0, 90.0, 90.0]);
        s.remove(&Dimension::RiskControl);
        let advice = generate_advice(&s, 67.5);
        assert_eq!(advice.dimensions.len(), 4);
        assert!(advice.next_steps.last().unwrap().contains("Risk Control"));
    }
}
