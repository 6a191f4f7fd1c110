//! Reference Datasets
//!
//! The three load-once datasets the pipeline reads: the local drug index,
//! the interaction table and the dosage reference table. They are wrapped in
//! `Arc` and never mutated; a refresh builds a new [`ReferenceData`].

pub mod drug_index;
pub mod interaction_table;
pub mod dosage_table;

pub use drug_index::{DrugConcept, DrugIndex, TermType};
pub use interaction_table::InteractionTable;
pub use dosage_table::{DosageReference, DosageTable};

use crate::app::config::DatasetConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared, read-only reference data
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub drugs: Arc<DrugIndex>,
    pub interactions: Arc<InteractionTable>,
    pub dosage: Arc<DosageTable>,
}

impl ReferenceData {
    /// Assemble reference data.
    ///
    /// Drug names carried by the interaction and dosage datasets are merged
    /// into the drug index (without overriding it) so those drugs resolve
    /// locally even when no RxNorm file is present.
    pub fn new(mut drugs: DrugIndex, interactions: InteractionTable, dosage: DosageTable) -> Self {
        let before = drugs.len();
        for record in interactions.records() {
            for (rxcui, name) in record.named_drugs() {
                drugs.insert_if_absent(rxcui, name);
            }
        }
        for entry in dosage.entries() {
            if let Some(rxcui) = &entry.rxcui {
                drugs.insert_if_absent(rxcui, &entry.name);
            }
        }
        let merged = drugs.len() - before;
        if merged > 0 {
            info!(merged, "Merged dataset drug names into local index");
        }

        Self {
            drugs: Arc::new(drugs),
            interactions: Arc::new(interactions),
            dosage: Arc::new(dosage),
        }
    }

    /// Load all datasets, falling back per dataset when a file is missing.
    ///
    /// Missing files are logged and replaced: an empty drug index (remote
    /// lookup only), the built-in sample interactions and the built-in dosage
    /// table. Files that exist but cannot be parsed are errors.
    pub fn load(config: &DatasetConfig) -> crate::Result<Self> {
        let drugs = match DrugIndex::load(&config.drug_index) {
            Ok(index) => index,
            Err(crate::Error::DatasetMissing(msg)) => {
                warn!(reason = %msg, "Local drug index unavailable, relying on dataset names and remote lookup");
                DrugIndex::empty()
            }
            Err(e) => return Err(e),
        };

        let interactions = match InteractionTable::load(&config.interactions) {
            Ok(table) => table,
            Err(crate::Error::DatasetMissing(msg)) => {
                warn!(reason = %msg, "Interaction dataset unavailable, using built-in sample data");
                InteractionTable::sample()
            }
            Err(e) => return Err(e),
        };

        let dosage = match DosageTable::load(&config.dosage_reference) {
            Ok(table) => table,
            Err(crate::Error::DatasetMissing(msg)) => {
                warn!(reason = %msg, "Dosage reference unavailable, using built-in table");
                DosageTable::builtin()
            }
            Err(e) => return Err(e),
        };

        let data = Self::new(drugs, interactions, dosage);
        info!(
            drugs = data.drugs.len(),
            interactions = data.interactions.len(),
            dosage_references = data.dosage.len(),
            "Reference data ready"
        );
        Ok(data)
    }

    /// Built-in sample data only, no files
    pub fn builtin() -> Self {
        Self::new(DrugIndex::empty(), InteractionTable::sample(), DosageTable::builtin())
    }
}
