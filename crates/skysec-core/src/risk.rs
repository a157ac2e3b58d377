//! Composite risk scoring
//!
//! `score = clamp(weight(status) * 0.7 + complexity * 6, 0, 100)`, rounded to
//! two decimals. Band thresholds are strict: 40.0 is LOW, 70.0 is ELEVATED.

use serde::{Deserialize, Serialize};

const STATUS_FACTOR: f64 = 0.7;
const COMPLEXITY_FACTOR: f64 = 6.0;
const CRITICAL_ABOVE: f64 = 70.0;
const ELEVATED_ABOVE: f64 = 40.0;

/// Mission readiness status as reported by the CRM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Ready,
    Degraded,
    NotReady,
    Unknown,
}

impl MissionStatus {
    /// Parse a status string case-insensitively; anything unrecognised is `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "READY" => MissionStatus::Ready,
            "DEGRADED" => MissionStatus::Degraded,
            "NOT_READY" => MissionStatus::NotReady,
            _ => MissionStatus::Unknown,
        }
    }

    /// Base risk weight for this status
    pub fn weight(self) -> f64 {
        match self {
            MissionStatus::Ready => 10.0,
            MissionStatus::Degraded => 50.0,
            MissionStatus::NotReady => 90.0,
            MissionStatus::Unknown => 100.0,
        }
    }
}

/// Risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Elevated,
    Critical,
}

impl RiskLevel {
    fn for_score(score: f64) -> Self {
        if score > CRITICAL_ABOVE {
            RiskLevel::Critical
        } else if score > ELEVATED_ABOVE {
            RiskLevel::Elevated
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Elevated => "ELEVATED",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring a mission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Score in 0-100, rounded to two decimals
    pub score: f64,
    pub risk_level: RiskLevel,
}

/// Score a mission from its raw status string and asset complexity.
///
/// Complexity is expected in 1-5 but is neither validated nor clamped; the
/// final score is clamped instead.
pub fn calculate_risk_score(status: &str, complexity: i64) -> RiskAssessment {
    score_status(MissionStatus::parse(status), complexity)
}

/// Score an already-parsed status
pub fn score_status(status: MissionStatus, complexity: i64) -> RiskAssessment {
    let raw = status.weight() * STATUS_FACTOR + complexity as f64 * COMPLEXITY_FACTOR;
    let score = round2(raw.clamp(0.0, 100.0));

    RiskAssessment {
        score,
        risk_level: RiskLevel::for_score(score),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
