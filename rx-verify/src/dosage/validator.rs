//! Dosage Validator
//!
//! Compares the observed dose of a drug with the reference range for the
//! patient's age band. Anything that prevents a comparison (no reference,
//! no band range, no dose, irreconcilable units) yields an `unknown` verdict
//! with a reason rather than an error.

use crate::dataset::dosage_table::{DosageReference, DosageTable};
use crate::dosage::frequency::Frequency;
use crate::dosage::types::{AgeBand, DosageFinding, DosageVerdict, DoseRange};
use crate::dosage::units::{convert_dose, DoseUnit};
use crate::normalize::types::NormalizedDrug;
use std::sync::Arc;
use tracing::debug;

/// Ages below this get the infant note
const INFANT_AGE_LIMIT: u32 = 2;
/// Ages at or above this get the very-elderly note
const VERY_ELDERLY_AGE_START: u32 = 80;

/// Geriatric warnings shared by every drug of a class
const GERIATRIC_CLASS_NOTES: &[(&str, &str)] = &[
    ("nsaid", "Increased GI and cardiovascular risks"),
    ("diuretic", "Monitor for dehydration and electrolyte imbalances"),
    ("benzodiazepine", "Increased fall risk; consider shorter-acting alternatives"),
    ("anticholinergic", "May cause confusion; monitor cognitive function"),
];

/// Age-banded dose checks against a shared reference table
#[derive(Debug, Clone)]
pub struct DosageValidator {
    table: Arc<DosageTable>,
}

impl DosageValidator {
    pub fn new(table: Arc<DosageTable>) -> Self {
        Self { table }
    }

    /// Reference entry for a drug, if the table has one
    pub fn reference_for(&self, drug: &NormalizedDrug) -> Option<&DosageReference> {
        let names = [drug.display_name(), drug.mention().trimmed_text()];
        self.table.find(drug.canonical_id(), &names)
    }

    pub fn validate(&self, drug: &NormalizedDrug, patient_age: u32) -> DosageFinding {
        self.validate_weighted(drug, patient_age, None)
    }

    /// Validate with the patient's weight, which enables mg/kg pediatric rules
    pub fn validate_weighted(&self, drug: &NormalizedDrug, patient_age: u32, weight_kg: Option<f64>) -> DosageFinding {
        let band = AgeBand::from_age(patient_age);
        let mut finding = DosageFinding {
            drug: drug.clone(),
            observed_dose: drug.mention().dose.clone(),
            normalized_value: None,
            age_band: band,
            verdict: DosageVerdict::Unknown,
            recommended_range: None,
            reference_unit: None,
            reason: String::new(),
            daily_total: None,
            weight_based_dose: None,
            notes: age_notes(patient_age),
            alternatives: Vec::new(),
        };

        let Some(reference) = self.reference_for(drug) else {
            finding.reason = format!("no dosage reference for {}", drug.display_name());
            return finding;
        };
        finding.notes.extend(reference.notes_for(band).iter().cloned());
        if band == AgeBand::Geriatric {
            finding.notes.extend(class_note(reference.class.as_deref()).map(str::to_string));
        }
        finding.alternatives = reference.alternatives.clone();
        finding.reference_unit = Some(reference.unit.clone());
        finding.recommended_range = reference.range_for(band);

        // mg/kg rule: pediatric patients with a known weight
        let mut max_daily = reference.max_daily;
        if let (AgeBand::Pediatric, Some(weight), Some(rule)) = (band, weight_kg, &reference.weight_based) {
            let dose = weight * rule.dose_per_kg;
            let weight_max = weight * rule.max_daily_per_kg;
            finding.weight_based_dose = Some(dose);
            finding.notes.push(format!(
                "Weight-based dose for {}kg: {}{}{} (max daily {}{})",
                format_amount(weight),
                format_amount(dose),
                reference.unit,
                rule.frequency.as_deref().map(|f| format!(" {}", f)).unwrap_or_default(),
                format_amount(weight_max),
                reference.unit
            ));
            max_daily = Some(max_daily.map_or(weight_max, |m| m.min(weight_max)));
        }

        let Some(range) = finding.recommended_range else {
            finding.reason = format!("no {} dosage range for {}", band, reference.name);
            return finding;
        };
        let Some(dose) = finding.observed_dose.clone() else {
            finding.reason = "no dose stated".to_string();
            return finding;
        };
        let Some(reference_unit) = reference.dose_unit() else {
            finding.reason = format!("unrecognised reference unit '{}'", reference.unit);
            return finding;
        };
        let Some(value) = convert_dose(&dose, reference_unit) else {
            finding.reason = format!("cannot compare {} with a range in {}", dose, reference_unit);
            return finding;
        };
        finding.normalized_value = Some(value);

        let (verdict, reason) = compare(value, range, reference_unit);
        finding.verdict = verdict;
        finding.reason = reason;

        if let Some(frequency) = drug.mention().frequency.as_deref().and_then(Frequency::parse) {
            let daily = value * frequency.times_per_day;
            finding.daily_total = Some(daily);
            if let Some(max_daily) = max_daily {
                if daily > max_daily * (1.0 + f64::EPSILON) {
                    finding.notes.push(format!(
                        "estimated daily total {}{} exceeds maximum daily dose {}{}",
                        format_amount(daily),
                        reference_unit,
                        format_amount(max_daily),
                        reference_unit
                    ));
                }
            }
        }

        debug!(
            drug = %drug.display_name(),
            band = %band,
            verdict = %finding.verdict,
            "Dosage validated"
        );
        finding
    }

    /// Validate every drug for one patient
    pub fn validate_all(&self, drugs: &[NormalizedDrug], patient_age: u32) -> Vec<DosageFinding> {
        self.validate_all_weighted(drugs, patient_age, None)
    }

    pub fn validate_all_weighted(
        &self,
        drugs: &[NormalizedDrug],
        patient_age: u32,
        weight_kg: Option<f64>,
    ) -> Vec<DosageFinding> {
        drugs
            .iter()
            .map(|d| self.validate_weighted(d, patient_age, weight_kg))
            .collect()
    }
}

fn compare(value: f64, range: DoseRange, unit: DoseUnit) -> (DosageVerdict, String) {
    let tolerance = 1e-9 * range.max.abs().max(1.0);
    let range_text = format!("{}-{}{}", format_amount(range.min), format_amount(range.max), unit);
    let value_text = format!("{}{}", format_amount(value), unit);

    if value < range.min - tolerance {
        (
            DosageVerdict::BelowRange,
            format!("{} is below the recommended range {}", value_text, range_text),
        )
    } else if value > range.max + tolerance {
        (
            DosageVerdict::AboveRange,
            format!("{} is above the recommended range {}", value_text, range_text),
        )
    } else {
        (
            DosageVerdict::WithinRange,
            format!("{} is within the recommended range {}", value_text, range_text),
        )
    }
}

fn age_notes(age: u32) -> Vec<String> {
    let mut notes = Vec::new();
    if age < INFANT_AGE_LIMIT {
        notes.push("Consult pediatrician for infants under 2 years".to_string());
    }
    if age >= VERY_ELDERLY_AGE_START {
        notes.push("Consider 'start low, go slow' approach for patients over 80".to_string());
    }
    notes
}

fn class_note(class: Option<&str>) -> Option<&'static str> {
    let class = class?.trim().to_lowercase();
    GERIATRIC_CLASS_NOTES
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, note)| *note)
}

/// Up to three decimals, trailing zeros dropped
pub(crate) fn format_amount(value: f64) -> String {
    let text = format!("{:.3}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::types::{DrugMention, MatchKind, UnresolvedReason};

    fn validator() -> DosageValidator {
        let content = r#"
            [[drug]]
            name = "testamol"
            rxcui = "900"
            unit = "mg"
            adult = { min = 5.0, max = 20.0 }
            pediatric = { min = 2.0, max = 10.0 }
            max_daily = 40.0
            pediatric_notes = ["Weight-based dosing preferred"]
        "#;
        DosageValidator::new(Arc::new(DosageTable::from_toml(content).unwrap()))
    }

    fn drug_with_dose(value: f64, unit: &str) -> NormalizedDrug {
        NormalizedDrug::local(
            DrugMention::new("Testamol").with_dose(value, unit),
            "900",
            "testamol",
            MatchKind::Exact,
        )
    }

    #[test]
    fn test_pediatric_dose_within_range() {
        let finding = validator().validate(&drug_with_dose(5.0, "mg"), 7);
        assert_eq!(finding.age_band, AgeBand::Pediatric);
        assert_eq!(finding.verdict, DosageVerdict::WithinRange);
        assert_eq!(finding.recommended_range, Some(DoseRange::new(2.0, 10.0)));
        assert_eq!(finding.notes, vec!["Weight-based dosing preferred".to_string()]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        assert_eq!(validator().validate(&drug_with_dose(2.0, "mg"), 7).verdict, DosageVerdict::WithinRange);
        assert_eq!(validator().validate(&drug_with_dose(10.0, "mg"), 7).verdict, DosageVerdict::WithinRange);
    }

    #[test]
    fn test_same_dose_different_bands() {
        let drug = drug_with_dose(15.0, "mg");
        assert_eq!(validator().validate(&drug, 7).verdict, DosageVerdict::AboveRange);
        assert_eq!(validator().validate(&drug, 30).verdict, DosageVerdict::WithinRange);
    }

    #[test]
    fn test_below_range() {
        let finding = validator().validate(&drug_with_dose(1.0, "mg"), 40);
        assert_eq!(finding.verdict, DosageVerdict::BelowRange);
        assert!(finding.reason.contains("below"));
        assert!(finding.is_out_of_range());
    }

    #[test]
    fn test_units_are_converted() {
        let finding = validator().validate(&drug_with_dose(5000.0, "mcg"), 7);
        assert_eq!(finding.normalized_value, Some(5.0));
        assert_eq!(finding.verdict, DosageVerdict::WithinRange);

        let finding = validator().validate(&drug_with_dose(0.015, "g"), 30);
        assert_eq!(finding.verdict, DosageVerdict::WithinRange);
    }

    #[test]
    fn test_irreconcilable_units_are_unknown() {
        let finding = validator().validate(&drug_with_dose(1.0, "tablet"), 30);
        assert_eq!(finding.verdict, DosageVerdict::Unknown);
        assert!(finding.reason.contains("cannot compare"));
    }

    #[test]
    fn test_missing_band_range_is_unknown() {
        // no geriatric range in this table
        let finding = validator().validate(&drug_with_dose(5.0, "mg"), 70);
        assert_eq!(finding.age_band, AgeBand::Geriatric);
        assert_eq!(finding.verdict, DosageVerdict::Unknown);
        assert!(finding.recommended_range.is_none());
    }

    #[test]
    fn test_missing_dose_is_unknown() {
        let drug = NormalizedDrug::local(DrugMention::new("testamol"), "900", "testamol", MatchKind::Exact);
        let finding = validator().validate(&drug, 30);
        assert_eq!(finding.verdict, DosageVerdict::Unknown);
        assert_eq!(finding.reason, "no dose stated");
        assert_eq!(finding.recommended_range, Some(DoseRange::new(5.0, 20.0)));
    }

    #[test]
    fn test_no_reference_is_unknown() {
        let drug = NormalizedDrug::unresolved(
            DrugMention::new("Xyzzyplex").with_dose(5.0, "mg"),
            UnresolvedReason::NotFound,
        );
        let finding = validator().validate(&drug, 30);
        assert_eq!(finding.verdict, DosageVerdict::Unknown);
        assert!(finding.reason.contains("Xyzzyplex"));
    }

    #[test]
    fn test_daily_total_above_maximum_adds_note() {
        let drug = NormalizedDrug::local(
            DrugMention::new("testamol").with_dose(15.0, "mg").with_frequency("q6h"),
            "900",
            "testamol",
            MatchKind::Exact,
        );
        let finding = validator().validate(&drug, 30);
        assert_eq!(finding.verdict, DosageVerdict::WithinRange);
        assert_eq!(finding.daily_total, Some(60.0));
        assert!(finding.notes.iter().any(|n| n.contains("exceeds maximum daily dose 40mg")));
    }

    #[test]
    fn test_daily_total_within_maximum() {
        let drug = NormalizedDrug::local(
            DrugMention::new("testamol").with_dose(10.0, "mg").with_frequency("bid"),
            "900",
            "testamol",
            MatchKind::Exact,
        );
        let finding = validator().validate(&drug, 30);
        assert_eq!(finding.daily_total, Some(20.0));
        assert!(finding.notes.is_empty());
    }

    #[test]
    fn test_age_notes() {
        assert_eq!(age_notes(1).len(), 1);
        assert!(age_notes(30).is_empty());
        assert!(age_notes(85)[0].contains("start low, go slow"));
    }

    #[test]
    fn test_builtin_aspirin_pediatric_warning() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let drug = NormalizedDrug::local(
            DrugMention::new("Aspirin").with_dose(100.0, "mg"),
            "1191",
            "aspirin",
            MatchKind::Exact,
        );
        let finding = validator.validate(&drug, 7);
        assert!(finding.notes.iter().any(|n| n.contains("Reye's syndrome")));
        assert_eq!(finding.recommended_range, Some(DoseRange::new(40.5, 325.0)));
        assert_eq!(finding.verdict, DosageVerdict::WithinRange);
    }

    fn builtin_drug(name: &str, rxcui: &str, value: f64) -> NormalizedDrug {
        NormalizedDrug::local(DrugMention::new(name).with_dose(value, "mg"), rxcui, name, MatchKind::Exact)
    }

    #[test]
    fn test_geriatric_class_warning() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let furosemide = builtin_drug("furosemide", "4603", 40.0);

        let finding = validator.validate(&furosemide, 70);
        assert!(finding.notes.iter().any(|n| n.contains("dehydration and electrolyte")));

        // class warnings are geriatric only
        let finding = validator.validate(&furosemide, 40);
        assert!(finding.notes.is_empty());
    }

    #[test]
    fn test_nsaid_class_warning_joins_drug_notes() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let finding = validator.validate(&builtin_drug("ibuprofen", "5640", 200.0), 72);
        assert!(finding.notes.iter().any(|n| n.contains("kidney function")));
        assert!(finding.notes.iter().any(|n| n.contains("GI and cardiovascular")));
    }

    #[test]
    fn test_alternatives_reported() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let finding = validator.validate(&builtin_drug("simvastatin", "36567", 20.0), 50);
        assert_eq!(finding.alternatives, vec!["atorvastatin", "rosuvastatin"]);

        assert!(validator.validate(&builtin_drug("warfarin", "11289", 5.0), 50).alternatives.is_empty());
    }

    #[test]
    fn test_weight_based_pediatric_dose() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let drug = NormalizedDrug::local(
            DrugMention::new("amoxicillin").with_dose(250.0, "mg").with_frequency("q8h"),
            "723",
            "amoxicillin",
            MatchKind::Exact,
        );

        let finding = validator.validate_weighted(&drug, 6, Some(20.0));
        assert_eq!(finding.weight_based_dose, Some(500.0));
        assert!(finding.notes.iter().any(|n| n == "Weight-based dose for 20kg: 500mg q8h (max daily 1800mg)"));
        assert_eq!(finding.daily_total, Some(750.0));
        assert!(!finding.notes.iter().any(|n| n.contains("exceeds")));

        // weight-based daily limit is tighter than the table maximum
        let finding = validator.validate_weighted(&drug, 6, Some(8.0));
        assert!(finding.notes.iter().any(|n| n.contains("exceeds maximum daily dose 720mg")));
    }

    #[test]
    fn test_weight_ignored_outside_pediatric_band() {
        let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
        let finding = validator.validate_weighted(&builtin_drug("amoxicillin", "723", 500.0), 30, Some(70.0));
        assert!(finding.weight_based_dose.is_none());

        let finding = validator.validate(&builtin_drug("amoxicillin", "723", 125.0), 6);
        assert!(finding.weight_based_dose.is_none());
    }

    #[test]
    fn test_class_note_lookup() {
        assert!(class_note(Some("Benzodiazepine")).is_some());
        assert!(class_note(Some("statin")).is_none());
        assert!(class_note(None).is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(5.0), "5");
        assert_eq!(format_amount(0.125), "0.125");
        assert_eq!(format_amount(2.5), "2.5");
    }
}
