//! Plain-text report rendering

use crate::dosage::types::DosageVerdict;
use crate::dosage::validator::format_amount;
use crate::normalize::types::Resolution;
use crate::report::types::SafetyReport;
use std::fmt::Write;

/// Plain-text builder for [`SafetyReport`] summaries
pub struct TextRenderer {
    buffer: String,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(2048),
        }
    }

    pub fn render(&mut self, report: &SafetyReport) -> String {
        self.buffer.clear();

        // String writes cannot fail
        self.write_header(report).expect("write to String");
        self.write_drugs(report).expect("write to String");
        self.write_interactions(report).expect("write to String");
        self.write_dosage(report).expect("write to String");
        self.write_rejected(report).expect("write to String");

        std::mem::take(&mut self.buffer)
    }

    fn write_header(&mut self, report: &SafetyReport) -> std::fmt::Result {
        let summary = report.summary();
        writeln!(self.buffer, "Prescription Safety Report")?;
        writeln!(self.buffer, "==========================")?;
        writeln!(self.buffer, "Report:       {}", report.id())?;
        writeln!(self.buffer, "Generated:    {}", report.generated_at().format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(self.buffer, "Patient age:  {} ({})", report.patient_age(), report.age_band())?;
        writeln!(self.buffer, "Overall risk: {}", report.overall_risk().as_str().to_uppercase())?;
        writeln!(
            self.buffer,
            "Interactions: {} (high {}, medium {}, low {})",
            summary.total, summary.high, summary.medium, summary.low
        )?;
        writeln!(self.buffer, "Dosage issues: {}", summary.dosage_issues)?;
        writeln!(self.buffer)?;
        Ok(())
    }

    fn write_drugs(&mut self, report: &SafetyReport) -> std::fmt::Result {
        writeln!(self.buffer, "Drugs")?;
        writeln!(self.buffer, "-----")?;
        if report.drugs().is_empty() {
            writeln!(self.buffer, "  (none)")?;
        }
        for drug in report.drugs() {
            match drug.canonical_id() {
                Some(id) => writeln!(
                    self.buffer,
                    "  {} -> {} [RxCUI {}] {} ({:.2})",
                    drug.mention().trimmed_text(),
                    drug.display_name(),
                    id,
                    drug.resolution().label(),
                    drug.confidence().value()
                )?,
                None => {
                    let reason = match drug.resolution() {
                        Resolution::Unresolved { reason } => reason.to_string(),
                        _ => String::new(),
                    };
                    writeln!(self.buffer, "  {} -> unresolved ({})", drug.display_name(), reason)?
                }
            }
        }
        writeln!(self.buffer)?;
        Ok(())
    }

    fn write_interactions(&mut self, report: &SafetyReport) -> std::fmt::Result {
        writeln!(self.buffer, "Interactions")?;
        writeln!(self.buffer, "------------")?;
        if report.findings().is_empty() {
            writeln!(self.buffer, "  No known interactions found")?;
        }
        for finding in report.findings() {
            writeln!(
                self.buffer,
                "  [{}] {} + {}",
                finding.severity.as_str().to_uppercase(),
                finding.drug_a.display_name(),
                finding.drug_b.display_name()
            )?;
            writeln!(self.buffer, "      {}", finding.record.description)?;
            if let Some(mechanism) = &finding.record.mechanism {
                writeln!(self.buffer, "      Mechanism: {}", mechanism)?;
            }
            if let Some(category) = &finding.escalated_by {
                writeln!(self.buffer, "      Escalated: {}", category)?;
            }
        }
        for unchecked in report.unable_to_check() {
            writeln!(
                self.buffer,
                "  Unable to check {}: {}",
                unchecked.display_name, unchecked.reason
            )?;
        }
        writeln!(self.buffer)?;
        Ok(())
    }

    fn write_dosage(&mut self, report: &SafetyReport) -> std::fmt::Result {
        writeln!(self.buffer, "Dosage")?;
        writeln!(self.buffer, "------")?;
        if report.dosage_findings().is_empty() {
            writeln!(self.buffer, "  (none)")?;
        }
        for finding in report.dosage_findings() {
            let marker = match finding.verdict {
                DosageVerdict::WithinRange => "OK",
                DosageVerdict::BelowRange => "LOW",
                DosageVerdict::AboveRange => "HIGH",
                DosageVerdict::Unknown => "??",
            };
            write!(self.buffer, "  [{}] {}", marker, finding.drug.display_name())?;
            if let Some(dose) = &finding.observed_dose {
                write!(self.buffer, " {}", dose)?;
            }
            writeln!(self.buffer, ": {}", finding.reason)?;
            if let Some(daily) = finding.daily_total {
                writeln!(
                    self.buffer,
                    "      Daily total: {}{}",
                    format_amount(daily),
                    finding.reference_unit.as_deref().unwrap_or("")
                )?;
            }
            for note in &finding.notes {
                writeln!(self.buffer, "      Note: {}", note)?;
            }
            if !finding.alternatives.is_empty() {
                writeln!(self.buffer, "      Alternatives: {}", finding.alternatives.join(", "))?;
            }
        }
        Ok(())
    }

    fn write_rejected(&mut self, report: &SafetyReport) -> std::fmt::Result {
        if report.rejected().is_empty() {
            return Ok(());
        }
        writeln!(self.buffer)?;
        writeln!(self.buffer, "Rejected mentions")?;
        writeln!(self.buffer, "-----------------")?;
        for rejected in report.rejected() {
            writeln!(self.buffer, "  '{}': {}", rejected.text, rejected.reason)?;
        }
        Ok(())
    }
}

impl SafetyReport {
    /// Human-readable summary
    pub fn render_text(&self) -> String {
        TextRenderer::new().render(self)
    }
}
