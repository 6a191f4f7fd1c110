//! Local Drug Index
//!
//! Name → RxCUI lookup built from an RxNorm `RXNCONSO.RRF` concepts file.
//! Full RRF rows are pipe-delimited with the RXCUI in column 0, language in
//! column 1, term type in column 12 and the concept string in column 14.
//! Simple `identifier|name` rows are accepted as well.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

const RRF_MIN_FIELDS: usize = 15;
const RRF_COL_RXCUI: usize = 0;
const RRF_COL_LAT: usize = 1;
const RRF_COL_TTY: usize = 12;
const RRF_COL_STR: usize = 14;

/// RxNorm term type of an indexed name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TermType {
    /// IN
    Ingredient,
    /// PIN
    PreciseIngredient,
    /// BN
    BrandName,
    /// SCD
    ClinicalDrug,
    /// SBD
    BrandedDrug,
    /// Two-column rows and names merged from other datasets
    Other,
}

impl TermType {
    /// Term types kept from RRF files; everything else is skipped
    fn from_rrf(tty: &str) -> Option<TermType> {
        match tty {
            "IN" => Some(TermType::Ingredient),
            "PIN" => Some(TermType::PreciseIngredient),
            "BN" => Some(TermType::BrandName),
            "SCD" => Some(TermType::ClinicalDrug),
            "SBD" => Some(TermType::BrandedDrug),
            _ => None,
        }
    }
}

/// A drug concept in the local index
#[derive(Debug, Clone, PartialEq)]
pub struct DrugConcept {
    pub rxcui: String,
    pub name: String,
    pub term_type: TermType,
}

/// Case-insensitive name index.
///
/// When several concepts share a name the better term type wins
/// (ingredient over brand over clinical drug), then the first one loaded.
#[derive(Debug, Default, Clone)]
pub struct DrugIndex {
    by_name: HashMap<String, DrugConcept>,
}

/// Index key: lower-case with internal whitespace collapsed
pub fn index_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl DrugIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(rxcui, name)` pairs
    pub fn from_entries<I, A, B>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut index = Self::empty();
        for (rxcui, name) in entries {
            index.insert(DrugConcept {
                rxcui: rxcui.into(),
                name: name.into(),
                term_type: TermType::Other,
            });
        }
        index
    }

    /// Load an RRF (or two-column) file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(crate::Error::DatasetMissing(format!(
                "drug index not found at {}",
                path.display()
            )));
        }
        let file = std::fs::File::open(path)?;
        let index = Self::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), names = index.len(), "Loaded local drug index");
        Ok(index)
    }

    /// Parse RRF rows from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> crate::Result<Self> {
        let mut index = Self::empty();
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(concept) => index.insert(concept),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped drug index rows (filtered or malformed)");
        }
        Ok(index)
    }

    /// Insert a concept, keeping the better-ranked one on name collisions
    fn insert(&mut self, concept: DrugConcept) {
        let key = index_key(&concept.name);
        if key.is_empty() || concept.rxcui.trim().is_empty() {
            return;
        }
        match self.by_name.get(&key) {
            Some(existing) if existing.term_type <= concept.term_type => {}
            _ => {
                self.by_name.insert(key, concept);
            }
        }
    }

    /// Add a name only when the index does not know it yet
    pub fn insert_if_absent(&mut self, rxcui: &str, name: &str) -> bool {
        let key = index_key(name);
        if key.is_empty() || rxcui.trim().is_empty() || self.by_name.contains_key(&key) {
            return false;
        }
        self.by_name.insert(
            key,
            DrugConcept {
                rxcui: rxcui.trim().to_string(),
                name: name.trim().to_string(),
                term_type: TermType::Other,
            },
        );
        true
    }

    /// Case-insensitive exact lookup
    pub fn get(&self, name: &str) -> Option<&DrugConcept> {
        self.by_name.get(&index_key(name))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn parse_line(line: &str) -> Option<DrugConcept> {
    let fields: Vec<&str> = line.split('|').collect();

    if fields.len() >= RRF_MIN_FIELDS {
        if fields[RRF_COL_LAT] != "ENG" {
            return None;
        }
        let term_type = TermType::from_rrf(fields[RRF_COL_TTY])?;
        return Some(DrugConcept {
            rxcui: fields[RRF_COL_RXCUI].trim().to_string(),
            name: fields[RRF_COL_STR].trim().to_string(),
            term_type,
        });
    }

    // identifier|name, optionally with a trailing delimiter
    let meaningful: Vec<&str> = fields.iter().copied().filter(|f| !f.trim().is_empty()).collect();
    if meaningful.len() == 2 && fields.len() <= 3 {
        return Some(DrugConcept {
            rxcui: meaningful[0].trim().to_string(),
            name: meaningful[1].trim().to_string(),
            term_type: TermType::Other,
        });
    }

    warn!(line, "Malformed drug index row");
    None
}
