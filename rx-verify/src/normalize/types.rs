//! Drug Mention and Normalization Types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dose as extracted from a prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dose {
    /// Numeric amount
    pub value: f64,
    /// Unit as written (e.g. "mg", "mcg", "tablet")
    pub unit: String,
}

impl Dose {
    /// Create a dose from a value and unit
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Parse free text such as `"500mg"`, `"2.5 milligrams"` or `"1 tablet"`.
    pub fn parse(text: &str) -> crate::Result<Self> {
        crate::dosage::units::parse_dose(text)
    }
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// A drug mention produced by upstream extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugMention {
    /// Raw drug text
    pub text: String,
    /// Dose, if one was extracted
    #[serde(default)]
    pub dose: Option<Dose>,
    /// Route of administration
    #[serde(default)]
    pub route: Option<String>,
    /// Dosing frequency (e.g. "bid", "twice daily")
    #[serde(default)]
    pub frequency: Option<String>,
}

impl DrugMention {
    /// Create a mention with only the drug text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dose: None,
            route: None,
            frequency: None,
        }
    }

    pub fn with_dose(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.dose = Some(Dose::new(value, unit));
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Drug text with surrounding whitespace removed
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

/// Confidence of a normalization, always within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Exact local index match
    pub const EXACT: Confidence = Confidence(1.0);
    /// Local match after cleaning dosage-form words and strengths
    pub const CLEANED: Confidence = Confidence(0.95);
    /// Exact match from the remote lookup service
    pub const REMOTE_EXACT: Confidence = Confidence(0.9);
    /// Approximate-term match from the remote lookup service
    pub const REMOTE_APPROXIMATE: Confidence = Confidence(0.6);
    /// Unresolved
    pub const NONE: Confidence = Confidence(0.0);

    /// Create a confidence, rejecting values outside [0, 1] and NaN
    pub fn new(value: f64) -> Option<Self> {
        if (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a confidence, clamping into [0, 1] (NaN becomes 0)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::NONE;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| format!("confidence must be in [0, 1], got {}", value))
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

/// How a name was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Case-insensitive exact name match
    Exact,
    /// Match after stripping dosage forms, strengths and brand hints
    Cleaned,
    /// Closest-term match reported by the remote service
    Approximate,
}

/// Why a mention could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Neither the local index nor the remote service knows the name
    NotFound,
    /// Remote service failed (network error, timeout, malformed response)
    LookupUnavailable(String),
    /// Remote lookup is turned off and the local index missed
    LookupDisabled,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotFound => write!(f, "not found"),
            UnresolvedReason::LookupUnavailable(msg) => write!(f, "lookup unavailable ({})", msg),
            UnresolvedReason::LookupDisabled => write!(f, "remote lookup disabled"),
        }
    }
}

/// Tagged outcome of the two-stage resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Resolution {
    /// Resolved from the local drug index
    Local { matched: MatchKind },
    /// Resolved by the remote lookup service
    Remote { matched: MatchKind },
    /// Could not be resolved
    Unresolved { reason: UnresolvedReason },
}

impl Resolution {
    /// Confidence implied by this resolution
    pub fn confidence(&self) -> Confidence {
        match self {
            Resolution::Local { matched: MatchKind::Exact } => Confidence::EXACT,
            Resolution::Local { .. } => Confidence::CLEANED,
            Resolution::Remote { matched: MatchKind::Approximate } => Confidence::REMOTE_APPROXIMATE,
            Resolution::Remote { .. } => Confidence::REMOTE_EXACT,
            Resolution::Unresolved { .. } => Confidence::NONE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Local { .. } => "resolved-local",
            Resolution::Remote { .. } => "resolved-remote",
            Resolution::Unresolved { .. } => "unresolved",
        }
    }
}

/// A mention mapped to a canonical drug concept.
///
/// Fields are private: a normalized drug cannot be altered once built, and its
/// confidence always follows from its [`Resolution`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDrug {
    mention: DrugMention,
    canonical_id: Option<String>,
    display_name: String,
    confidence: Confidence,
    resolution: Resolution,
}

impl NormalizedDrug {
    /// Drug resolved from the local index
    pub fn local(
        mention: DrugMention,
        canonical_id: impl Into<String>,
        display_name: impl Into<String>,
        matched: MatchKind,
    ) -> Self {
        Self::resolved(mention, canonical_id.into(), display_name.into(), Resolution::Local { matched })
    }

    /// Drug resolved by the remote lookup service
    pub fn remote(
        mention: DrugMention,
        canonical_id: impl Into<String>,
        display_name: impl Into<String>,
        matched: MatchKind,
    ) -> Self {
        Self::resolved(mention, canonical_id.into(), display_name.into(), Resolution::Remote { matched })
    }

    /// Unresolved drug: confidence 0, display name is the original text
    pub fn unresolved(mention: DrugMention, reason: UnresolvedReason) -> Self {
        let display_name = mention.trimmed_text().to_string();
        Self {
            mention,
            canonical_id: None,
            display_name,
            confidence: Confidence::NONE,
            resolution: Resolution::Unresolved { reason },
        }
    }

    fn resolved(mention: DrugMention, canonical_id: String, display_name: String, resolution: Resolution) -> Self {
        Self {
            mention,
            canonical_id: Some(canonical_id),
            display_name,
            confidence: resolution.confidence(),
            resolution,
        }
    }

    pub fn mention(&self) -> &DrugMention {
        &self.mention
    }

    /// Canonical identifier (RxCUI); `None` when unresolved
    pub fn canonical_id(&self) -> Option<&str> {
        self.canonical_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.canonical_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_rejects_out_of_range() {
        assert!(Confidence::new(1.2).is_none());
        assert!(Confidence::new(-0.1).is_none());
        assert!(Confidence::new(f64::NAN).is_none());
        assert_eq!(Confidence::new(0.5).map(Confidence::value), Some(0.5));
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Confidence::clamped(3.0).value(), 1.0);
        assert_eq!(Confidence::clamped(-3.0).value(), 0.0);
        assert_eq!(Confidence::clamped(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_confidence_deserialize_validates() {
        let ok: Confidence = serde_json::from_str("0.75").unwrap();
        assert_eq!(ok.value(), 0.75);
        assert!(serde_json::from_str::<Confidence>("1.5").is_err());
    }

    #[test]
    fn test_local_exact_has_full_confidence() {
        let drug = NormalizedDrug::local(DrugMention::new("Aspirin"), "1191", "aspirin", MatchKind::Exact);
        assert_eq!(drug.confidence(), Confidence::EXACT);
        assert_eq!(drug.canonical_id(), Some("1191"));
        assert_eq!(drug.resolution().label(), "resolved-local");
    }

    #[test]
    fn test_confidence_ordering_prefers_local() {
        let local = Resolution::Local { matched: MatchKind::Cleaned }.confidence();
        let remote = Resolution::Remote { matched: MatchKind::Exact }.confidence();
        let approx = Resolution::Remote { matched: MatchKind::Approximate }.confidence();
        assert!(local > remote);
        assert!(remote > approx);
    }

    #[test]
    fn test_unresolved_uses_original_text() {
        let drug = NormalizedDrug::unresolved(DrugMention::new("  Xyzzyplex "), UnresolvedReason::NotFound);
        assert_eq!(drug.display_name(), "Xyzzyplex");
        assert_eq!(drug.confidence().value(), 0.0);
        assert!(!drug.is_resolved());
        assert_eq!(drug.resolution().label(), "unresolved");
    }

    #[test]
    fn test_mention_builder() {
        let mention = DrugMention::new("Amoxicillin")
            .with_dose(500.0, "mg")
            .with_route("oral")
            .with_frequency("tid");
        assert_eq!(mention.dose, Some(Dose::new(500.0, "mg")));
        assert_eq!(mention.route.as_deref(), Some("oral"));
        assert_eq!(mention.frequency.as_deref(), Some("tid"));
    }

    #[test]
    fn test_resolution_serializes_tagged() {
        let json = serde_json::to_string(&Resolution::Local { matched: MatchKind::Exact }).unwrap();
        assert_eq!(json, r#"{"source":"local","matched":"exact"}"#);
    }
}
