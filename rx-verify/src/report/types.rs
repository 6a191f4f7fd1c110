//! Safety Report Types

use crate::dosage::types::{AgeBand, DosageFinding};
use crate::interaction::resolver::UncheckedDrug;
use crate::interaction::types::{InteractionFinding, Severity};
use crate::normalize::types::NormalizedDrug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall risk of a report: the highest interaction severity, or none.
///
/// Ordered so that `None < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Max severity of `severities`, `None` when empty
    pub fn from_severities<I: IntoIterator<Item = Severity>>(severities: I) -> Self {
        severities.into_iter().max().map(RiskLevel::from).unwrap_or(RiskLevel::None)
    }
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => RiskLevel::Low,
            Severity::Medium => RiskLevel::Medium,
            Severity::High => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mention rejected before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedMention {
    /// Raw text as received (may be empty)
    pub text: String,
    pub reason: String,
}

/// Counts shown at the top of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Dosage findings outside their reference range
    pub dosage_issues: usize,
    pub unresolved: usize,
}

/// Result of one verification request.
///
/// Built once by the report assembler; fields are read-only.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyReport {
    pub(crate) id: Uuid,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) patient_age: u32,
    pub(crate) age_band: AgeBand,
    pub(crate) drugs: Vec<NormalizedDrug>,
    pub(crate) findings: Vec<InteractionFinding>,
    pub(crate) dosage_findings: Vec<DosageFinding>,
    pub(crate) unable_to_check: Vec<UncheckedDrug>,
    pub(crate) rejected: Vec<RejectedMention>,
    pub(crate) overall_risk: RiskLevel,
    pub(crate) summary: SeveritySummary,
}

impl SafetyReport {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn patient_age(&self) -> u32 {
        self.patient_age
    }

    pub fn age_band(&self) -> AgeBand {
        self.age_band
    }

    /// Normalized drugs in request order
    pub fn drugs(&self) -> &[NormalizedDrug] {
        &self.drugs
    }

    /// Interaction findings, most severe first
    pub fn findings(&self) -> &[InteractionFinding] {
        &self.findings
    }

    pub fn dosage_findings(&self) -> &[DosageFinding] {
        &self.dosage_findings
    }

    pub fn unable_to_check(&self) -> &[UncheckedDrug] {
        &self.unable_to_check
    }

    pub fn rejected(&self) -> &[RejectedMention] {
        &self.rejected
    }

    pub fn overall_risk(&self) -> RiskLevel {
        self.overall_risk
    }

    pub fn summary(&self) -> SeveritySummary {
        self.summary
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
