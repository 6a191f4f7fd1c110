//! Interaction Resolver
//!
//! Probes every unordered pair of resolved drugs against the interaction
//! table. Drugs that cannot take part in a check are reported separately
//! instead of silently dropped.

use crate::dataset::interaction_table::InteractionTable;
use crate::interaction::types::InteractionRecord;
use crate::normalize::types::NormalizedDrug;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Why a drug was left out of the interaction check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UncheckedReason {
    /// The mention has no canonical identifier
    Unresolved,
    /// The drug is the only resolved one among several mentions
    NoResolvedPartner,
}

impl fmt::Display for UncheckedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncheckedReason::Unresolved => write!(f, "could not be identified"),
            UncheckedReason::NoResolvedPartner => write!(f, "no other identified drug to compare with"),
        }
    }
}

/// A drug reported as "unable to check"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncheckedDrug {
    pub display_name: String,
    pub reason: UncheckedReason,
}

/// A pair of drugs with a matching dataset record
#[derive(Debug, Clone)]
pub struct ResolvedPair {
    pub drug_a: NormalizedDrug,
    pub drug_b: NormalizedDrug,
    pub record: Arc<InteractionRecord>,
}

/// Output of [`InteractionResolver::resolve`]
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    pub matches: Vec<ResolvedPair>,
    pub unable_to_check: Vec<UncheckedDrug>,
}

/// Pairwise lookup against a shared interaction table
#[derive(Debug, Clone)]
pub struct InteractionResolver {
    table: Arc<InteractionTable>,
}

impl InteractionResolver {
    pub fn new(table: Arc<InteractionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &InteractionTable {
        &self.table
    }

    /// Find all interactions among `drugs`.
    ///
    /// Drugs sharing an identifier are collapsed to the first occurrence.
    /// Pairs are returned in input order, the earlier drug as `drug_a`.
    pub fn resolve(&self, drugs: &[NormalizedDrug]) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();
        let mut seen = HashSet::new();
        let mut resolved: Vec<(&str, &NormalizedDrug)> = Vec::new();

        for drug in drugs {
            match drug.canonical_id() {
                Some(id) => {
                    if seen.insert(id) {
                        resolved.push((id, drug));
                    } else {
                        debug!(rxcui = id, mention = %drug.mention().text, "Duplicate drug collapsed");
                    }
                }
                None => outcome.unable_to_check.push(UncheckedDrug {
                    display_name: drug.display_name().to_string(),
                    reason: UncheckedReason::Unresolved,
                }),
            }
        }

        if resolved.len() == 1 && drugs.len() > 1 {
            outcome.unable_to_check.push(UncheckedDrug {
                display_name: resolved[0].1.display_name().to_string(),
                reason: UncheckedReason::NoResolvedPartner,
            });
        }

        for (i, (id_a, drug_a)) in resolved.iter().enumerate() {
            for (id_b, drug_b) in &resolved[i + 1..] {
                if let Some(record) = self.table.get(id_a, id_b) {
                    outcome.matches.push(ResolvedPair {
                        drug_a: (*drug_a).clone(),
                        drug_b: (*drug_b).clone(),
                        record: record.clone(),
                    });
                }
            }
        }

        debug!(
            drugs = drugs.len(),
            checked = resolved.len(),
            matches = outcome.matches.len(),
            "Interaction resolution complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::types::{DrugMention, MatchKind, UnresolvedReason};

    fn drug(id: &str, name: &str) -> NormalizedDrug {
        NormalizedDrug::local(DrugMention::new(name), id, name, MatchKind::Exact)
    }

    fn unresolved(name: &str) -> NormalizedDrug {
        NormalizedDrug::unresolved(DrugMention::new(name), UnresolvedReason::NotFound)
    }

    fn resolver() -> InteractionResolver {
        InteractionResolver::new(Arc::new(InteractionTable::sample()))
    }

    #[test]
    fn test_finds_sample_pair() {
        let outcome = resolver().resolve(&[drug("1191", "aspirin"), drug("11289", "warfarin")]);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].drug_a.display_name(), "aspirin");
        assert!(outcome.unable_to_check.is_empty());
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let forward = resolver().resolve(&[drug("1191", "aspirin"), drug("11289", "warfarin")]);
        let reverse = resolver().resolve(&[drug("11289", "warfarin"), drug("1191", "aspirin")]);
        assert_eq!(forward.matches.len(), 1);
        assert_eq!(reverse.matches.len(), 1);
        assert!(Arc::ptr_eq(&forward.matches[0].record, &reverse.matches[0].record));
    }

    #[test]
    fn test_no_record_no_finding() {
        let outcome = resolver().resolve(&[drug("1191", "aspirin"), drug("6809", "metformin")]);
        assert!(outcome.matches.is_empty());
        assert!(outcome.unable_to_check.is_empty());
    }

    #[test]
    fn test_all_pairs_checked() {
        let outcome = resolver().resolve(&[
            drug("11289", "warfarin"),
            drug("1191", "aspirin"),
            drug("723", "amoxicillin"),
            drug("6809", "metformin"),
            drug("5640", "ibuprofen"),
        ]);
        // warfarin+aspirin, warfarin+amoxicillin, metformin+ibuprofen
        assert_eq!(outcome.matches.len(), 3);
    }

    #[test]
    fn test_duplicate_identifiers_collapsed() {
        let outcome = resolver().resolve(&[
            drug("1191", "aspirin"),
            drug("1191", "Aspirin 81 mg"),
            drug("11289", "warfarin"),
        ]);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].drug_a.display_name(), "aspirin");
    }

    #[test]
    fn test_unresolved_reported_unable_to_check() {
        let outcome = resolver().resolve(&[
            drug("1191", "aspirin"),
            unresolved("Xyzzyplex"),
            drug("11289", "warfarin"),
        ]);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(
            outcome.unable_to_check,
            vec![UncheckedDrug {
                display_name: "Xyzzyplex".to_string(),
                reason: UncheckedReason::Unresolved,
            }]
        );
    }

    #[test]
    fn test_single_resolved_drug_has_no_partner() {
        let outcome = resolver().resolve(&[drug("1191", "aspirin"), unresolved("Xyzzyplex")]);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.unable_to_check.len(), 2);
        assert_eq!(outcome.unable_to_check[1].reason, UncheckedReason::NoResolvedPartner);
    }

    #[test]
    fn test_single_drug_request_reports_nothing() {
        let outcome = resolver().resolve(&[drug("1191", "aspirin")]);
        assert!(outcome.matches.is_empty());
        assert!(outcome.unable_to_check.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let outcome = resolver().resolve(&[]);
        assert!(outcome.matches.is_empty());
        assert!(outcome.unable_to_check.is_empty());
    }
}
