//! Publication readiness reporting types.

use serde::{Deserialize, Serialize};

/// An issue that blocks publication regardless of the overall score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockingIssue {
    /// A required field is missing.
    MissingRequiredField { field: String },

    /// The compatibility list never reached consensus for the target
    /// market.
    UnverifiedMarketCompatibility,

    /// The run was aborted by a critical provider failure.
    CriticalError { detail: String },
}

impl std::fmt::Display for BlockingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockingIssue::MissingRequiredField { field } => {
                write!(f, "missing required field: {field}")
            }
            BlockingIssue::UnverifiedMarketCompatibility => {
                write!(f, "compatibility not verified for target market")
            }
            BlockingIssue::CriticalError { detail } => write!(f, "critical error: {detail}"),
        }
    }
}

/// Weighted publication-readiness assessment of a record.
///
/// Sub-scores are bounded [0, 1]; the overall score is the fixed weighted
/// sum computed by [`QualityGate`](crate::pipeline::QualityGate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// Fixed weighted sum of the sub-scores, in [0, 1].
    pub overall_score: f32,

    /// Required-field completeness (weight 0.4).
    pub completeness: f32,

    /// Data quality / confidence (weight 0.25).
    pub data_quality: f32,

    /// Target-market compliance (weight 0.15).
    pub market_compliance: f32,

    /// Image validation (weight 0.1).
    pub image_score: f32,

    /// Source reliability (weight 0.1).
    pub source_reliability: f32,

    /// Issues that block publication outright.
    pub blocking_issues: Vec<BlockingIssue>,

    /// Non-blocking improvement suggestions.
    pub recommendations: Vec<String>,

    /// `overall_score >= threshold` and no blocking issues.
    pub publish_ready: bool,

    /// Operator triage estimate in minutes; informational only.
    pub manual_effort_min: u32,
}
