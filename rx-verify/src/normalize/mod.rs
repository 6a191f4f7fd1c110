//! Drug Normalization
//!
//! Maps free-text drug mentions to canonical RxCUIs. The local index is
//! consulted first; misses fall through to an external [`DrugLookup`]
//! (RxNav in production) and anything left over is reported unresolved.

pub mod types;
pub mod lookup;
pub mod http_retry;
pub mod rxnav;
pub mod normalizer;

pub use lookup::{DrugLookup, LookupFuture, LookupOutcome};
pub use normalizer::{clean_name, DrugNormalizer};
pub use rxnav::RxNavClient;
pub use types::{Confidence, Dose, DrugMention, MatchKind, NormalizedDrug, Resolution, UnresolvedReason};
