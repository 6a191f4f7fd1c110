//! Dosage Types

use crate::normalize::types::{Dose, NormalizedDrug};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ages below this are pediatric
pub const PEDIATRIC_AGE_LIMIT: u32 = 12;
/// Ages at or above this are geriatric
pub const GERIATRIC_AGE_START: u32 = 65;

/// Patient age band used to select dosage reference ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBand {
    Pediatric,
    Adult,
    Geriatric,
}

impl AgeBand {
    /// Classify an age in whole years
    pub fn from_age(age: u32) -> Self {
        if age < PEDIATRIC_AGE_LIMIT {
            AgeBand::Pediatric
        } else if age >= GERIATRIC_AGE_START {
            AgeBand::Geriatric
        } else {
            AgeBand::Adult
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBand::Pediatric => "pediatric",
            AgeBand::Adult => "adult",
            AgeBand::Geriatric => "geriatric",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive single-dose range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseRange {
    pub min: f64,
    pub max: f64,
}

impl DoseRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range with both bounds multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Pediatric mg/kg dosing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBasedDose {
    /// Single dose per kilogram of body weight
    pub dose_per_kg: f64,
    /// Daily maximum per kilogram of body weight
    pub max_daily_per_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl WeightBasedDose {
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        positive(self.dose_per_kg) && positive(self.max_daily_per_kg) && self.dose_per_kg <= self.max_daily_per_kg
    }
}

/// Outcome of comparing a dose with its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DosageVerdict {
    WithinRange,
    BelowRange,
    AboveRange,
    Unknown,
}

impl DosageVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            DosageVerdict::WithinRange => "within-range",
            DosageVerdict::BelowRange => "below-range",
            DosageVerdict::AboveRange => "above-range",
            DosageVerdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DosageVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dose check result for one drug
#[derive(Debug, Clone, Serialize)]
pub struct DosageFinding {
    pub drug: NormalizedDrug,
    /// Dose as written on the prescription
    pub observed_dose: Option<Dose>,
    /// Observed dose converted to the reference unit
    pub normalized_value: Option<f64>,
    pub age_band: AgeBand,
    pub verdict: DosageVerdict,
    /// Reference range for the age band, if known
    pub recommended_range: Option<DoseRange>,
    /// Unit of `recommended_range` and `normalized_value`
    pub reference_unit: Option<String>,
    /// Human-readable explanation of the verdict
    pub reason: String,
    /// Estimated daily total when the frequency is interpretable
    pub daily_total: Option<f64>,
    /// Single dose from the mg/kg rule, when the patient weight is known
    pub weight_based_dose: Option<f64>,
    /// Age-band considerations, drug-class warnings and daily-limit warnings
    pub notes: Vec<String>,
    /// Alternative drugs listed for this reference entry
    pub alternatives: Vec<String>,
}

impl DosageFinding {
    /// True when the dose is known to be outside its reference range
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.verdict, DosageVerdict::BelowRange | DosageVerdict::AboveRange)
    }
}
