//! Drug-Drug Interactions
//!
//! Pairwise lookup against the interaction table ([`InteractionResolver`])
//! and severity tiering of each match ([`SeverityClassifier`]).

pub mod types;
pub mod resolver;
pub mod severity;

pub use resolver::{InteractionResolver, ResolutionOutcome, ResolvedPair, UncheckedDrug, UncheckedReason};
pub use severity::{builtin_categories, Classification, KeywordCategory, SeverityClassifier};
pub use types::{InteractionFinding, InteractionRecord, PairKey, Severity};
