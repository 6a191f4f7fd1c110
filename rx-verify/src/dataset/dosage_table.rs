//! Dosage Reference Table
//!
//! Age-banded single-dose ranges per drug, loaded from TOML:
//!
//! ```toml
//! [[drug]]
//! name = "ibuprofen"
//! rxcui = "5640"
//! unit = "mg"
//! adult = { min = 200.0, max = 800.0 }
//! pediatric = { min = 100.0, max = 400.0 }
//! max_daily = 3200.0
//! class = "nsaid"
//! alternatives = ["naproxen", "diclofenac"]
//! pediatric_notes = ["Not recommended for infants under 6 months"]
//! weight_based = { dose_per_kg = 10.0, max_daily_per_kg = 40.0, frequency = "q6-8h" }
//! ```

use crate::dataset::drug_index::index_key;
use crate::dosage::types::{AgeBand, DoseRange, WeightBasedDose};
use crate::dosage::units::DoseUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Factor applied to adult ranges for the built-in pediatric band
const BUILTIN_PEDIATRIC_FACTOR: f64 = 0.5;
/// Factor applied to adult ranges for the built-in geriatric band
const BUILTIN_GERIATRIC_FACTOR: f64 = 0.75;

/// Reference entry for one drug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rxcui: Option<String>,
    /// Unit of all ranges and of `max_daily`
    pub unit: String,
    pub adult: DoseRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pediatric: Option<DoseRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geriatric: Option<DoseRange>,
    /// Maximum total per day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily: Option<f64>,
    /// Typical schedule, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pediatric_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geriatric_notes: Vec<String>,
    /// Drug class (`nsaid`, `diuretic`, ...) for class-wide warnings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// Pediatric mg/kg rule, applied when the patient weight is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_based: Option<WeightBasedDose>,
}

impl DosageReference {
    /// Range for an age band; `None` when the band has no reference
    pub fn range_for(&self, band: AgeBand) -> Option<DoseRange> {
        match band {
            AgeBand::Pediatric => self.pediatric,
            AgeBand::Adult => Some(self.adult),
            AgeBand::Geriatric => self.geriatric,
        }
    }

    /// Clinical notes for an age band
    pub fn notes_for(&self, band: AgeBand) -> &[String] {
        match band {
            AgeBand::Pediatric => &self.pediatric_notes,
            AgeBand::Adult => &[],
            AgeBand::Geriatric => &self.geriatric_notes,
        }
    }

    /// Parsed reference unit
    pub fn dose_unit(&self) -> Option<DoseUnit> {
        DoseUnit::parse(&self.unit)
    }

    fn validate(&self) -> Result<(), String> {
        if index_key(&self.name).is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.dose_unit().is_none() {
            return Err(format!("unknown unit '{}'", self.unit));
        }
        let bands = [
            ("adult", Some(self.adult)),
            ("pediatric", self.pediatric),
            ("geriatric", self.geriatric),
        ];
        for (band, range) in bands {
            if let Some(range) = range {
                if !range.is_valid() {
                    return Err(format!("invalid {} range {}-{}", band, range.min, range.max));
                }
            }
        }
        if let Some(max_daily) = self.max_daily {
            if !(max_daily.is_finite() && max_daily > 0.0) {
                return Err(format!("max_daily must be positive, got {}", max_daily));
            }
        }
        if self.weight_based.as_ref().is_some_and(|rule| !rule.is_valid()) {
            return Err("weight_based needs positive doses with dose_per_kg <= max_daily_per_kg".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DosageTableFile {
    #[serde(default, rename = "drug")]
    drugs: Vec<DosageReference>,
}

/// Read-only dosage reference table
#[derive(Debug, Default)]
pub struct DosageTable {
    entries: Vec<DosageReference>,
    by_rxcui: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl DosageTable {
    /// Build from entries, skipping invalid ones; the first entry per name wins
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = DosageReference>,
    {
        let mut table = Self::default();
        for entry in entries {
            if let Err(reason) = entry.validate() {
                warn!(drug = %entry.name, reason = %reason, "Skipping invalid dosage reference");
                continue;
            }
            let key = index_key(&entry.name);
            if table.by_name.contains_key(&key) {
                warn!(drug = %entry.name, "Duplicate dosage reference ignored");
                continue;
            }
            let idx = table.entries.len();
            table.by_name.insert(key, idx);
            if let Some(rxcui) = &entry.rxcui {
                table.by_rxcui.entry(rxcui.trim().to_string()).or_insert(idx);
            }
            table.entries.push(entry);
        }
        table
    }

    /// Load a TOML reference file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(crate::Error::DatasetMissing(format!(
                "dosage reference not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_toml(&content)?;
        info!(path = %path.display(), drugs = table.len(), "Loaded dosage reference table");
        Ok(table)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let file: DosageTableFile = toml::from_str(content)?;
        Ok(Self::from_entries(file.drugs))
    }

    /// Serialize in the same layout [`DosageTable::from_toml`] reads
    pub fn to_toml(&self) -> crate::Result<String> {
        let file = DosageTableFile {
            drugs: self.entries.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Write the table as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Find the reference for a drug.
    ///
    /// Tries the identifier, then each name exactly, then the first reference
    /// name that appears as a whole word in one of the names
    /// (e.g. "aspirin" in "aspirin 81 MG Oral Tablet").
    pub fn find(&self, rxcui: Option<&str>, names: &[&str]) -> Option<&DosageReference> {
        if let Some(idx) = rxcui.and_then(|id| self.by_rxcui.get(id.trim())) {
            return self.entries.get(*idx);
        }

        let keys: Vec<String> = names.iter().map(|n| index_key(n)).filter(|k| !k.is_empty()).collect();
        for key in &keys {
            if let Some(idx) = self.by_name.get(key) {
                return self.entries.get(*idx);
            }
        }

        self.entries.iter().find(|entry| {
            let needle = index_key(&entry.name);
            keys.iter().any(|key| contains_word(key, &needle))
        })
    }

    pub fn entries(&self) -> &[DosageReference] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in reference table.
    ///
    /// Adult ranges and daily maxima are the standard single-dose ranges the
    /// verifier ships with; pediatric and geriatric bands are the adult range
    /// scaled by fixed factors.
    pub fn builtin() -> Self {
        let entry = |name: &str, rxcui: &str, min: f64, max: f64, max_daily: f64, frequency: &str| {
            let adult = DoseRange::new(min, max);
            DosageReference {
                name: name.to_string(),
                rxcui: Some(rxcui.to_string()),
                unit: "mg".to_string(),
                adult,
                pediatric: Some(adult.scaled(BUILTIN_PEDIATRIC_FACTOR)),
                geriatric: Some(adult.scaled(BUILTIN_GERIATRIC_FACTOR)),
                max_daily: Some(max_daily),
                frequency: Some(frequency.to_string()),
                pediatric_notes: Vec::new(),
                geriatric_notes: Vec::new(),
                class: None,
                alternatives: Vec::new(),
                weight_based: None,
            }
        };
        let per_kg = |dose_per_kg: f64, max_daily_per_kg: f64, frequency: &str| {
            Some(WeightBasedDose {
                dose_per_kg,
                max_daily_per_kg,
                frequency: Some(frequency.to_string()),
            })
        };
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        let weight_note = "Dose based on weight: 10-15mg/kg every 4-6 hours".to_string();

        let mut entries = vec![
            entry("acetaminophen", "161", 325.0, 1000.0, 4000.0, "q4-6h"),
            entry("paracetamol", "161", 325.0, 1000.0, 4000.0, "q4-6h"),
            entry("ibuprofen", "5640", 200.0, 800.0, 3200.0, "q6-8h"),
            entry("aspirin", "1191", 81.0, 650.0, 4000.0, "q4-6h"),
            entry("metformin", "6809", 500.0, 1000.0, 2500.0, "bid"),
            entry("lisinopril", "29046", 2.5, 40.0, 40.0, "daily"),
            entry("amlodipine", "17767", 2.5, 10.0, 10.0, "daily"),
            entry("simvastatin", "36567", 5.0, 80.0, 80.0, "daily"),
            entry("warfarin", "11289", 1.0, 10.0, 15.0, "daily"),
            entry("digoxin", "3407", 0.125, 0.5, 0.5, "daily"),
            entry("furosemide", "4603", 20.0, 80.0, 600.0, "daily"),
            entry("amoxicillin", "723", 250.0, 1000.0, 3000.0, "tid"),
        ];

        for e in &mut entries {
            match e.name.as_str() {
                "acetaminophen" | "paracetamol" => {
                    e.pediatric_notes.push(weight_note.clone());
                    e.alternatives = names(&["ibuprofen (if no contraindications)"]);
                    e.weight_based = per_kg(15.0, 60.0, "q6h");
                }
                "ibuprofen" => {
                    e.pediatric_notes.push("Not recommended for infants under 6 months".to_string());
                    e.geriatric_notes.push("Monitor kidney function and blood pressure".to_string());
                    e.class = Some("nsaid".to_string());
                    e.alternatives = names(&["naproxen", "diclofenac", "celecoxib"]);
                    e.weight_based = per_kg(10.0, 40.0, "q6-8h");
                }
                "aspirin" => e
                    .pediatric_notes
                    .push("Avoid in children under 16 due to Reye's syndrome risk".to_string()),
                "digoxin" => e
                    .geriatric_notes
                    .push("Increased risk of toxicity; monitor levels closely".to_string()),
                "warfarin" => e
                    .geriatric_notes
                    .push("Higher bleeding risk; more frequent INR monitoring".to_string()),
                "furosemide" => e.class = Some("diuretic".to_string()),
                "simvastatin" => e.alternatives = names(&["atorvastatin", "rosuvastatin"]),
                "lisinopril" => e.alternatives = names(&["enalapril", "ramipril", "losartan"]),
                "amlodipine" => e.alternatives = names(&["nifedipine", "felodipine", "verapamil"]),
                "amoxicillin" => e.weight_based = per_kg(25.0, 90.0, "q8h"),
                _ => {}
            }
        }

        Self::from_entries(entries)
    }
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumerics
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
