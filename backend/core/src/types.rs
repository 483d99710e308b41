use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DprError;
use crate::features::FeatureSet;

/// A Daily/Detailed Progress Report under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DprRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: DprStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Reason the pipeline gave up, set only on `failed` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DprRecord {
    /// A fresh placeholder in the `processing` state.
    pub fn new(filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            status: DprStatus::Processing,
            analysis: None,
            decision: None,
            risk_level: None,
            overall_score: None,
            feedback: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a successful aggregation. All result fields change together.
    pub fn apply_completion(&mut self, completion: &Completion) {
        self.status = DprStatus::Done;
        self.analysis = Some(completion.analysis.clone());
        self.decision = Some(completion.decision);
        self.risk_level = Some(completion.risk_level);
        self.overall_score = Some(completion.overall_score);
        self.feedback = Some(completion.feedback.clone());
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn apply_failure(&mut self, failure: &Failure) {
        self.status = DprStatus::Failed;
        self.analysis = failure.partial.clone();
        self.error = Some(failure.reason.clone());
        self.updated_at = Utc::now();
    }
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DprStatus {
    Processing,
    Done,
    Failed,
}

impl DprStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DprStatus::Processing => "processing",
            DprStatus::Done => "done",
            DprStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DprStatus::Processing)
    }
}

impl fmt::Display for DprStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DprStatus {
    type Err = DprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DprStatus::Processing),
            "done" => Ok(DprStatus::Done),
            "failed" => Ok(DprStatus::Failed),
            other => Err(DprError::InvalidInput(format!("unknown status '{other}'"))),
        }
    }
}

/// Final categorical outcome of a review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "Approve")]
    Approve,
    #[serde(alias = "Review")]
    Review,
    #[serde(alias = "Reject")]
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Review => "review",
            Decision::Reject => "reject",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = DprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(Decision::Approve),
            "review" => Ok(Decision::Review),
            "reject" => Ok(Decision::Reject),
            _ => Err(DprError::InvalidInput(format!("unknown decision '{s}'"))),
        }
    }
}

/// Severity assigned by the risk predictor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Decision implied by a bare risk label.
    pub fn implied_decision(&self) -> Decision {
        match self {
            RiskLevel::Low => Decision::Approve,
            RiskLevel::Medium => Decision::Review,
            RiskLevel::High => Decision::Reject,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = DprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(DprError::InvalidInput(format!("unknown risk level '{s}'"))),
        }
    }
}

/// Output of one feature extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub features: FeatureSet,
    /// Quality score as a 0–1 fraction, if the extractor produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Structured output of the risk predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub decision: Decision,
    pub level: RiskLevel,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl RiskPrediction {
    /// Parse a predictor response body.
    ///
    /// Accepts `{decision, level, reasons}` as well as the label-only
    /// `{"prediction": "High"}` shape, for which the decision is implied by the level.
    pub fn from_response(body: &serde_json::Value) -> Result<Self, DprError> {
        if body.get("level").is_some() {
            return serde_json::from_value(body.clone()).map_err(|e| {
                DprError::PredictionFailed(format!("malformed prediction response: {e}"))
            });
        }

        let label = body
            .get("prediction")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DprError::PredictionFailed("response carries neither 'level' nor 'prediction'".into())
            })?;
        let level: RiskLevel = label
            .parse()
            .map_err(|_| DprError::PredictionFailed(format!("unrecognised risk label '{label}'")))?;

        Ok(Self {
            decision: level.implied_decision(),
            level,
            reasons: Vec::new(),
        })
    }

    /// Human-readable feedback: reasons joined by semicolons.
    pub fn feedback(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Combined result of extraction and prediction persisted on a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<ExtractionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ExtractionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskPrediction>,
}

/// Everything the aggregation step writes when a record reaches `done`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub analysis: Analysis,
    pub decision: Decision,
    pub risk_level: RiskLevel,
    pub overall_score: u8,
    pub feedback: String,
}

/// What gets written when a record reaches `failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub reason: String,
    /// Branch results that did succeed, kept for diagnostics.
    pub partial: Option<Analysis>,
}

/// Filter for listing records.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub risk_level: Option<RiskLevel>,
    pub status: Option<DprStatus>,
    pub limit: usize,
}

/// Result of the free-text analysis path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub issues: Vec<String>,
    pub feasibility_insights: Vec<String>,
    pub suggestions: Vec<String>,
}
