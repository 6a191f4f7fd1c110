//! Report Assembler

use crate::dosage::types::{AgeBand, DosageFinding};
use crate::interaction::resolver::UncheckedDrug;
use crate::interaction::types::InteractionFinding;
use crate::interaction::Severity;
use crate::normalize::types::NormalizedDrug;
use crate::report::types::{RejectedMention, RiskLevel, SafetyReport, SeveritySummary};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Everything a report is built from
#[derive(Debug, Clone, Default)]
pub struct ReportParts {
    pub patient_age: u32,
    pub drugs: Vec<NormalizedDrug>,
    pub findings: Vec<InteractionFinding>,
    pub dosage_findings: Vec<DosageFinding>,
    pub unable_to_check: Vec<UncheckedDrug>,
    pub rejected: Vec<RejectedMention>,
}

/// Builds immutable [`SafetyReport`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Sort findings (severity high to low, then drug names), compute the
    /// overall risk and summary, and stamp id and time.
    pub fn assemble(&self, parts: ReportParts) -> SafetyReport {
        let ReportParts {
            patient_age,
            drugs,
            mut findings,
            dosage_findings,
            unable_to_check,
            rejected,
        } = parts;

        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.sort_names().cmp(&b.sort_names()))
        });

        let overall_risk = RiskLevel::from_severities(findings.iter().map(|f| f.severity));
        let count = |tier: Severity| findings.iter().filter(|f| f.severity == tier).count();
        let summary = SeveritySummary {
            total: findings.len(),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            dosage_issues: dosage_findings.iter().filter(|d| d.is_out_of_range()).count(),
            unresolved: drugs.iter().filter(|d| !d.is_resolved()).count(),
        };

        let report = SafetyReport {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patient_age,
            age_band: AgeBand::from_age(patient_age),
            drugs,
            findings,
            dosage_findings,
            unable_to_check,
            rejected,
            overall_risk,
            summary,
        };

        info!(
            report_id = %report.id,
            overall_risk = %report.overall_risk,
            interactions = summary.total,
            dosage_issues = summary.dosage_issues,
            "Safety report assembled"
        );
        report
    }
}
