// Self-assessment quiz: question normalization, scoring and advice.
// Advice is never stored; it is regenerated from persisted scores on every read.

pub mod advice;
pub mod handlers;
pub mod questions;
pub mod scoring;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four fixed assessment dimensions, declared in canonical order.
/// `Ord` follows declaration order, so `BTreeMap<Dimension, _>` iterates canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TimeManagement,
    ResourceCoordination,
    RiskControl,
    TeamCollaboration,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::TimeManagement,
        Dimension::ResourceCoordination,
        Dimension::RiskControl,
        Dimension::TeamCollaboration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::TimeManagement => "time_management",
            Dimension::ResourceCoordination => "resource_coordination",
            Dimension::RiskControl => "risk_control",
            Dimension::TeamCollaboration => "team_collaboration",
        }
    }

    /// Human-readable name used in advice text and the PDF report.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::TimeManagement => "Time Management",
            Dimension::ResourceCoordination => "Resource Coordination",
            Dimension::RiskControl => "Risk Control",
            Dimension::TeamCollaboration => "Team Collaboration",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| format!("unknown dimension '{s}'"))
    }
}
