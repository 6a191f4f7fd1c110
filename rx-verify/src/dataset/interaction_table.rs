//! Interaction Dataset
//!
//! Curated drug-drug interaction records, indexed once by unordered
//! identifier pair. The CSV layout accepts both the raw column names
//! (`drug_a`, `drug_b`, `description`) and the RxCUI-mapped ones
//! (`drug_a_rxcui`, `drug_b_rxcui`, `interaction_text`).

use crate::interaction::types::{InteractionRecord, PairKey, Severity};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const DRUG_A_ID_COLUMNS: &[&str] = &["drug_a_rxcui", "drug_a"];
const DRUG_B_ID_COLUMNS: &[&str] = &["drug_b_rxcui", "drug_b"];
const DRUG_A_NAME_COLUMNS: &[&str] = &["drug_a_name"];
const DRUG_B_NAME_COLUMNS: &[&str] = &["drug_b_name"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "interaction_text"];
const SEVERITY_COLUMNS: &[&str] = &["severity"];
const MECHANISM_COLUMNS: &[&str] = &["mechanism"];
const SOURCES_COLUMNS: &[&str] = &["sources", "source"];

/// Header written by [`InteractionTable::write_csv`]
const CSV_HEADER: [&str; 8] = [
    "drug_a_name",
    "drug_a_rxcui",
    "drug_b_name",
    "drug_b_rxcui",
    "description",
    "severity",
    "mechanism",
    "sources",
];

/// Column positions resolved from a CSV header
#[derive(Debug)]
struct ColumnMap {
    drug_a_id: usize,
    drug_b_id: usize,
    description: usize,
    drug_a_name: Option<usize>,
    drug_b_name: Option<usize>,
    severity: Option<usize>,
    mechanism: Option<usize>,
    sources: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> crate::Result<Self> {
        let find = |candidates: &[&str]| {
            candidates.iter().find_map(|name| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name))
            })
        };
        let require = |candidates: &[&str]| {
            find(candidates).ok_or_else(|| {
                crate::Error::Dataset(format!(
                    "interaction dataset is missing a '{}' column",
                    candidates.join("' or '")
                ))
            })
        };

        Ok(Self {
            drug_a_id: require(DRUG_A_ID_COLUMNS)?,
            drug_b_id: require(DRUG_B_ID_COLUMNS)?,
            description: require(DESCRIPTION_COLUMNS)?,
            drug_a_name: find(DRUG_A_NAME_COLUMNS),
            drug_b_name: find(DRUG_B_NAME_COLUMNS),
            severity: find(SEVERITY_COLUMNS),
            mechanism: find(MECHANISM_COLUMNS),
            sources: find(SOURCES_COLUMNS),
        })
    }

    fn record(&self, row: &StringRecord) -> Option<InteractionRecord> {
        let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
        let optional = |idx: Option<usize>| {
            idx.map(field)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let a = field(self.drug_a_id);
        let b = field(self.drug_b_id);
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let mut record = InteractionRecord::new(a, b, field(self.description));
        record.drug_a_name = optional(self.drug_a_name);
        record.drug_b_name = optional(self.drug_b_name);
        record.mechanism = optional(self.mechanism);
        record.severity_hint = optional(self.severity).and_then(|s| Severity::parse_hint(&s));
        record.sources = optional(self.sources)
            .map(|s| {
                s.split(';')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(record)
    }
}

/// Read-only interaction table indexed by [`PairKey`]
#[derive(Debug, Default)]
pub struct InteractionTable {
    records: Vec<Arc<InteractionRecord>>,
    index: HashMap<PairKey, Arc<InteractionRecord>>,
    duplicates_ignored: usize,
}

impl InteractionTable {
    /// Build the table; the first record for a pair wins
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = InteractionRecord>,
    {
        let mut table = Self::default();
        for record in records {
            table.push(record);
        }
        table
    }

    fn push(&mut self, record: InteractionRecord) {
        let key = record.pair();
        if key.is_self_pair() {
            warn!(pair = %key, "Skipping interaction record that pairs a drug with itself");
            return;
        }
        if self.index.contains_key(&key) {
            warn!(pair = %key, "Duplicate interaction record ignored (first loaded wins)");
            self.duplicates_ignored += 1;
            return;
        }
        let record = Arc::new(record);
        self.index.insert(key, Arc::clone(&record));
        self.records.push(record);
    }

    /// Load a CSV dataset
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(crate::Error::DatasetMissing(format!(
                "interaction dataset not found at {}",
                path.display()
            )));
        }
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        info!(
            path = %path.display(),
            records = table.len(),
            duplicates = table.duplicates_ignored,
            "Loaded interaction dataset"
        );
        Ok(table)
    }

    /// Parse CSV from any reader
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> crate::Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = ColumnMap::from_headers(csv_reader.headers()?)?;
        let mut table = Self::default();
        let mut skipped = 0usize;

        for (line, row) in csv_reader.records().enumerate() {
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(row = line + 2, error = %e, "Unreadable interaction row");
                    skipped += 1;
                    continue;
                }
            };
            match columns.record(&row) {
                Some(record) => table.push(record),
                None => {
                    warn!(row = line + 2, "Interaction row without both drug identifiers");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped interaction rows");
        }
        Ok(table)
    }

    /// Built-in sample dataset used when no dataset file is available
    pub fn sample() -> Self {
        Self::from_records(sample_records())
    }

    /// Look up the record for an unordered identifier pair
    pub fn get(&self, a: &str, b: &str) -> Option<&Arc<InteractionRecord>> {
        self.index.get(&PairKey::new(a, b))
    }

    /// Records in load order
    pub fn records(&self) -> &[Arc<InteractionRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of duplicate pairs dropped while loading
    pub fn duplicates_ignored(&self) -> usize {
        self.duplicates_ignored
    }

    /// Write the table as CSV in the RxCUI-mapped layout
    pub fn write_csv(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(CSV_HEADER)?;
        for record in &self.records {
            writer.write_record([
                record.drug_a_name.as_deref().unwrap_or(""),
                record.drug_a_id.as_str(),
                record.drug_b_name.as_deref().unwrap_or(""),
                record.drug_b_id.as_str(),
                record.description.as_str(),
                record.severity_hint.map(|s| s.as_str()).unwrap_or(""),
                record.mechanism.as_deref().unwrap_or(""),
                record.sources.join(";").as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn sample_records() -> Vec<InteractionRecord> {
    vec![
        InteractionRecord::new(
            "11289",
            "1191",
            "Increased risk of bleeding. Monitor INR closely and adjust warfarin dose as needed.",
        )
        .with_names("warfarin", "aspirin")
        .with_severity(Severity::High)
        .with_mechanism("Additive anticoagulant and antiplatelet effects increase bleeding risk")
        .with_sources(["DrugBank", "Lexicomp"]),
        InteractionRecord::new(
            "6809",
            "5640",
            "NSAIDs may reduce kidney function and affect metformin elimination.",
        )
        .with_names("metformin", "ibuprofen")
        .with_severity(Severity::Medium)
        .with_sources(["DrugBank"]),
        InteractionRecord::new(
            "29046",
            "5640",
            "NSAIDs may reduce the antihypertensive effect of ACE inhibitors.",
        )
        .with_names("lisinopril", "ibuprofen")
        .with_severity(Severity::Medium)
        .with_sources(["DrugBank", "Clinical"]),
        InteractionRecord::new(
            "3407",
            "4603",
            "Furosemide may increase digoxin levels by causing hypokalemia.",
        )
        .with_names("digoxin", "furosemide")
        .with_severity(Severity::High)
        .with_mechanism("Diuretic-induced hypokalemia increases digoxin toxicity")
        .with_sources(["Lexicomp"]),
        InteractionRecord::new(
            "36567",
            "17767",
            "Amlodipine may increase simvastatin levels. Consider dose reduction.",
        )
        .with_names("simvastatin", "amlodipine")
        .with_severity(Severity::Medium)
        .with_mechanism("CYP3A4 inhibition raises statin exposure")
        .with_sources(["FDA", "DrugBank"]),
        InteractionRecord::new(
            "11289",
            "723",
            "Antibiotics may alter gut flora and affect warfarin metabolism.",
        )
        .with_names("warfarin", "amoxicillin")
        .with_severity(Severity::Medium)
        .with_sources(["Clinical"]),
        InteractionRecord::new(
            "10689",
            "36437",
            "Increased risk of serotonin syndrome. Monitor for symptoms.",
        )
        .with_names("tramadol", "sertraline")
        .with_severity(Severity::High)
        .with_mechanism("Combined serotonergic activity")
        .with_sources(["FDA", "DrugBank"]),
        InteractionRecord::new(
            "83367",
            "21212",
            "Clarithromycin may significantly increase statin levels and risk of myopathy.",
        )
        .with_names("atorvastatin", "clarithromycin")
        .with_severity(Severity::High)
        .with_mechanism("Strong CYP3A4 inhibition raises statin exposure")
        .with_sources(["FDA", "Lexicomp"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_sample_dataset_contents() {
        let table = InteractionTable::sample();
        assert_eq!(table.len(), 8);
        let record = table.get("1191", "11289").expect("warfarin/aspirin present");
        assert_eq!(record.severity_hint, Some(Severity::High));
        assert_eq!(record.sources, vec!["DrugBank".to_string(), "Lexicomp".to_string()]);
    }

    #[test]
    fn test_lookup_is_symmetric_for_every_record() {
        let table = InteractionTable::sample();
        for record in table.records() {
            let forward = table.get(&record.drug_a_id, &record.drug_b_id).unwrap();
            let backward = table.get(&record.drug_b_id, &record.drug_a_id).unwrap();
            assert!(Arc::ptr_eq(forward, backward));
            assert_eq!(forward.as_ref(), record.as_ref());
        }
    }

    #[test]
    fn test_first_duplicate_wins() {
        let table = InteractionTable::from_records([
            InteractionRecord::new("1", "2", "first"),
            InteractionRecord::new("2", "1", "second"),
            InteractionRecord::new("1", "3", "other"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicates_ignored(), 1);
        assert_eq!(table.get("1", "2").unwrap().description, "first");
    }

    #[test]
    fn test_self_pair_rejected() {
        let table = InteractionTable::from_records([InteractionRecord::new("7", "7", "self")]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_raw_column_layout() {
        let csv = "drug_a,drug_b,description,severity,mechanism,sources\n\
                   11289,1191,Bleeding risk,Major,Platelet inhibition,DrugBank; FDA\n\
                   6809,5640,Kidney effects,,,\n";
        let table = InteractionTable::from_csv_reader(Cursor::new(csv)).unwrap();
        assert_eq!(table.len(), 2);

        let bleeding = table.get("1191", "11289").unwrap();
        assert_eq!(bleeding.severity_hint, Some(Severity::High));
        assert_eq!(bleeding.mechanism.as_deref(), Some("Platelet inhibition"));
        assert_eq!(bleeding.sources, vec!["DrugBank".to_string(), "FDA".to_string()]);

        let kidney = table.get("5640", "6809").unwrap();
        assert_eq!(kidney.severity_hint, None);
        assert!(kidney.mechanism.is_none());
        assert!(kidney.sources.is_empty());
    }

    #[test]
    fn test_mapped_columns_take_precedence() {
        // Processed datasets keep the raw name column alongside the RxCUI column
        let csv = "drug_a,drug_a_name,drug_a_rxcui,drug_b,drug_b_name,drug_b_rxcui,interaction_text\n\
                   Warfarin,warfarin,11289,Aspirin,aspirin,1191,Bleeding\n";
        let table = InteractionTable::from_csv_reader(Cursor::new(csv)).unwrap();
        let record = table.get("11289", "1191").unwrap();
        assert_eq!(record.drug_a_name.as_deref(), Some("warfarin"));
        assert_eq!(record.description, "Bleeding");
    }

    #[test]
    fn test_missing_required_column_is_dataset_error() {
        let csv = "drug_a,drug_b\n1,2\n";
        let result = InteractionTable::from_csv_reader(Cursor::new(csv));
        assert!(matches!(result, Err(crate::Error::Dataset(_))));
    }

    #[test]
    fn test_rows_without_identifiers_are_skipped() {
        let csv = "drug_a,drug_b,description\n,1191,orphan\n1,2,ok\n";
        let table = InteractionTable::from_csv_reader(Cursor::new(csv)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = InteractionTable::load(Path::new("/tmp/no_such_ddi_dataset_12345.csv"));
        assert!(matches!(result, Err(crate::Error::DatasetMissing(_))));
    }

    #[test]
    fn test_write_and_reload_sample() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("processed").join("ddi.csv");

        InteractionTable::sample().write_csv(&path).expect("Failed to write CSV");
        let reloaded = InteractionTable::load(&path).expect("Failed to reload CSV");

        assert_eq!(reloaded.len(), 8);
        let record = reloaded.get("10689", "36437").unwrap();
        assert_eq!(record.drug_a_name.as_deref(), Some("tramadol"));
        assert_eq!(record.mechanism.as_deref(), Some("Combined serotonergic activity"));
    }
}
