//! Severity Classifier
//!
//! Assigns the final tier of an interaction: the dataset hint (or the
//! configured default), escalated to `high` when the interaction matches a
//! high-risk keyword category. An explicit `high` hint is never lowered.

use crate::dataset::drug_index::index_key;
use crate::interaction::resolver::ResolvedPair;
use crate::interaction::types::{InteractionFinding, InteractionRecord, Severity};
use crate::normalize::types::NormalizedDrug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named group of high-risk terms.
///
/// Fires when any keyword occurs as a whole word in the interaction's
/// mechanism (or description), or when both drugs of the pair are listed in
/// `drugs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
}

impl KeywordCategory {
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            drugs: Vec::new(),
        }
    }

    pub fn with_drugs<I, S>(mut self, drugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drugs = drugs.into_iter().map(Into::into).collect();
        self
    }
}

/// Categories used when the configuration does not list any
pub fn builtin_categories() -> Vec<KeywordCategory> {
    vec![
        KeywordCategory::new(
            "qt_prolongation",
            ["qt prolongation", "qt interval", "qtc", "torsades de pointes", "torsade de pointes"],
        ),
        KeywordCategory::new("serotonin_syndrome", ["serotonin syndrome", "serotonergic"]),
        KeywordCategory::new("bleeding_risk", ["bleeding", "hemorrhage", "haemorrhage"]).with_drugs([
            "warfarin",
            "aspirin",
            "clopidogrel",
            "heparin",
            "apixaban",
            "rivaroxaban",
            "dabigatran",
        ]),
        KeywordCategory::new("respiratory_depression", ["respiratory depression"]),
        KeywordCategory::new("contraindicated", ["contraindicated", "life-threatening", "fatal"]),
    ]
}

/// Result of classifying one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    /// Category that raised the tier to `high`
    pub escalated_by: Option<String>,
}

#[derive(Debug)]
struct CompiledCategory {
    name: String,
    pattern: Option<Regex>,
    drugs: HashSet<String>,
}

impl CompiledCategory {
    fn compile(category: &KeywordCategory) -> crate::Result<Self> {
        let alternatives: Vec<String> = category
            .keywords
            .iter()
            .map(|k| k.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
            .filter(|k| !k.is_empty())
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            // non-word boundaries so keywords may start or end with punctuation
            let source = format!(r"(?i)(?:^|\W)(?:{})(?:\W|$)", alternatives.join("|"));
            Some(Regex::new(&source).map_err(|e| {
                crate::Error::Config(format!("invalid keywords in category '{}': {}", category.name, e))
            })?)
        };

        Ok(Self {
            name: category.name.clone(),
            pattern,
            drugs: category.drugs.iter().map(|d| index_key(d)).filter(|d| !d.is_empty()).collect(),
        })
    }

    fn matches(&self, text: &str, a: &NormalizedDrug, b: &NormalizedDrug) -> bool {
        if self.pattern.as_ref().is_some_and(|p| p.is_match(text)) {
            return true;
        }
        !self.drugs.is_empty()
            && self.drugs.contains(&index_key(a.display_name()))
            && self.drugs.contains(&index_key(b.display_name()))
    }
}

/// Deterministic severity classification
#[derive(Debug)]
pub struct SeverityClassifier {
    default_tier: Severity,
    categories: Vec<CompiledCategory>,
}

impl SeverityClassifier {
    pub fn new(default_tier: Severity, categories: &[KeywordCategory]) -> crate::Result<Self> {
        let categories = categories
            .iter()
            .map(CompiledCategory::compile)
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self { default_tier, categories })
    }

    /// Medium default with the built-in categories
    pub fn builtin() -> Self {
        let categories = builtin_categories()
            .iter()
            .filter_map(|c| CompiledCategory::compile(c).ok())
            .collect();
        Self {
            default_tier: Severity::Medium,
            categories,
        }
    }

    pub fn default_tier(&self) -> Severity {
        self.default_tier
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn classify(&self, record: &InteractionRecord, a: &NormalizedDrug, b: &NormalizedDrug) -> Classification {
        let base = record.severity_hint.unwrap_or(self.default_tier);
        if base == Severity::High {
            return Classification {
                severity: Severity::High,
                escalated_by: None,
            };
        }

        let text = record.heuristic_text();
        match self.categories.iter().find(|c| c.matches(text, a, b)) {
            Some(category) => Classification {
                severity: Severity::High,
                escalated_by: Some(category.name.clone()),
            },
            None => Classification {
                severity: base,
                escalated_by: None,
            },
        }
    }

    /// Classify a resolved pair into a finding
    pub fn finding(&self, pair: ResolvedPair) -> InteractionFinding {
        let Classification { severity, escalated_by } = self.classify(&pair.record, &pair.drug_a, &pair.drug_b);
        InteractionFinding {
            drug_a: pair.drug_a,
            drug_b: pair.drug_b,
            record: pair.record,
            severity,
            escalated_by,
        }
    }
}
