//! Verification Requests
//!
//! JSON input of the pipeline:
//!
//! ```json
//! {
//!   "patient_age": 7,
//!   "weight_kg": 22.5,
//!   "mentions": [
//!     { "text": "Aspirin", "dose": "5 mg", "route": "oral", "frequency": "bid" }
//!   ]
//! }
//! ```
//!
//! `dose` may also be given structured, as `{ "value": 5.0, "unit": "mg" }`.
//! `weight_kg` is optional and only used by mg/kg pediatric rules.

use crate::normalize::types::{Dose, DrugMention};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Oldest accepted patient age
pub const MAX_PATIENT_AGE: u32 = 130;
/// Heaviest accepted patient weight
pub const MAX_PATIENT_WEIGHT_KG: f64 = 650.0;

/// Dose as received: free text or already split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DoseInput {
    Text(String),
    Structured(Dose),
}

/// One extracted drug mention as received
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MentionInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<DoseInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl MentionInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_dose_text(mut self, dose: impl Into<String>) -> Self {
        self.dose = Some(DoseInput::Text(dose.into()));
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Convert into a [`DrugMention`], parsing the dose.
    ///
    /// Blank dose text counts as no dose; unparsable or negative doses are
    /// `MalformedInput`.
    pub fn into_mention(self) -> crate::Result<DrugMention> {
        let dose = match self.dose {
            None => None,
            Some(DoseInput::Text(text)) if text.trim().is_empty() => None,
            Some(DoseInput::Text(text)) => Some(Dose::parse(&text)?),
            Some(DoseInput::Structured(dose)) => Some(dose),
        };

        if let Some(dose) = &dose {
            if !dose.value.is_finite() || dose.value < 0.0 {
                return Err(crate::Error::MalformedInput(format!(
                    "dose value must be a non-negative number, got {}",
                    dose.value
                )));
            }
            if dose.unit.trim().is_empty() {
                return Err(crate::Error::MalformedInput("dose unit is empty".to_string()));
            }
        }

        Ok(DrugMention {
            text: self.text,
            dose,
            route: self.route.filter(|r| !r.trim().is_empty()),
            frequency: self.frequency.filter(|f| !f.trim().is_empty()),
        })
    }
}

impl From<DrugMention> for MentionInput {
    fn from(mention: DrugMention) -> Self {
        Self {
            text: mention.text,
            dose: mention.dose.map(DoseInput::Structured),
            route: mention.route,
            frequency: mention.frequency,
        }
    }
}

/// Patient age plus the mentions extracted from one prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub patient_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub mentions: Vec<MentionInput>,
}

impl VerificationRequest {
    pub fn new(patient_age: u32) -> Self {
        Self {
            patient_age,
            weight_kg: None,
            mentions: Vec::new(),
        }
    }

    /// Request with bare drug names
    pub fn from_names(patient_age: u32, names: &[&str]) -> Self {
        Self {
            patient_age,
            weight_kg: None,
            mentions: names.iter().map(|n| MentionInput::new(*n)).collect(),
        }
    }

    pub fn with_mention(mut self, mention: MentionInput) -> Self {
        self.mentions.push(mention);
        self
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.patient_age > MAX_PATIENT_AGE {
            return Err(crate::Error::MalformedInput(format!(
                "patient_age must be at most {}, got {}",
                MAX_PATIENT_AGE, self.patient_age
            )));
        }
        if let Some(weight) = self.weight_kg {
            if !(weight.is_finite() && weight > 0.0 && weight <= MAX_PATIENT_WEIGHT_KG) {
                return Err(crate::Error::MalformedInput(format!(
                    "weight_kg must be in (0, {}], got {}",
                    MAX_PATIENT_WEIGHT_KG, weight
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(content: &str) -> crate::Result<Self> {
        let request: Self = serde_json::from_str(content)
            .map_err(|e| crate::Error::MalformedInput(format!("invalid verification request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    /// Load a request from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
