//! Interaction Types

use crate::normalize::types::NormalizedDrug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Clinical risk tier of a drug-drug interaction.
///
/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Interpret a free-text severity hint from a dataset row.
    ///
    /// Accepts the tier names plus the common clinical synonyms
    /// (`major`/`severe`, `moderate`, `minor`). Anything else is no hint.
    pub fn parse_hint(text: &str) -> Option<Severity> {
        match text.trim().to_lowercase().as_str() {
            "high" | "major" | "severe" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" | "minor" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::parse_hint(s)
            .ok_or_else(|| crate::Error::MalformedInput(format!("unknown severity tier '{}'", s)))
    }
}

/// Unordered pair of canonical identifiers.
///
/// The two identifiers are stored sorted, so `PairKey::new(a, b) == PairKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }

    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.first, self.second)
    }
}

/// A curated interaction between two drug concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Identifier of the first drug as written in the dataset
    pub drug_a_id: String,
    /// Identifier of the second drug as written in the dataset
    pub drug_b_id: String,
    /// Display name of the first drug as written in the dataset
    pub drug_a_name: Option<String>,
    /// Display name of the second drug as written in the dataset
    pub drug_b_name: Option<String>,
    /// Free-text description / clinical advice
    pub description: String,
    /// Pharmacological mechanism, if known
    pub mechanism: Option<String>,
    /// Severity given by the dataset, if any
    pub severity_hint: Option<Severity>,
    /// Provenance (e.g. "DrugBank", "Lexicomp")
    pub sources: Vec<String>,
}

impl InteractionRecord {
    /// Create a record with only the required fields
    pub fn new(a: impl Into<String>, b: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            drug_a_id: a.into(),
            drug_b_id: b.into(),
            drug_a_name: None,
            drug_b_name: None,
            description: description.into(),
            mechanism: None,
            severity_hint: None,
            sources: Vec::new(),
        }
    }

    /// Unordered key of the two identifiers
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.drug_a_id.as_str(), self.drug_b_id.as_str())
    }

    /// Dataset (identifier, name) pairs for drugs that carry a name
    pub fn named_drugs(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            (self.drug_a_id.as_str(), self.drug_a_name.as_deref()),
            (self.drug_b_id.as_str(), self.drug_b_name.as_deref()),
        ]
        .into_iter()
        .filter_map(|(id, name)| name.map(|n| (id, n)))
    }

    pub fn with_names(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.drug_a_name = Some(a.into());
        self.drug_b_name = Some(b.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity_hint = Some(severity);
        self
    }

    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = Some(mechanism.into());
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Text the severity heuristics inspect: the mechanism when present,
    /// otherwise the description.
    pub fn heuristic_text(&self) -> &str {
        match &self.mechanism {
            Some(m) if !m.trim().is_empty() => m,
            _ => &self.description,
        }
    }
}

/// A classified interaction between two drugs of one request
#[derive(Debug, Clone, Serialize)]
pub struct InteractionFinding {
    pub drug_a: NormalizedDrug,
    pub drug_b: NormalizedDrug,
    /// Matched record, shared with the interaction table
    pub record: Arc<InteractionRecord>,
    /// Final severity tier
    pub severity: Severity,
    /// Keyword category that escalated the tier to high, if any
    pub escalated_by: Option<String>,
}

impl InteractionFinding {
    /// Both display names, lower-cased, in sorted order (used for stable sorting)
    pub fn sort_names(&self) -> (String, String) {
        let a = self.drug_a.display_name().to_lowercase();
        let b = self.drug_b.display_name().to_lowercase();
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
