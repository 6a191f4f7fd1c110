//! # rx-verify
//!
//! Drug-interaction and dosage-safety evaluation for prescription verification.
//!
//! ## Overview
//!
//! This library takes drug mentions extracted from a prescription (by an OCR/NER
//! front end that lives outside this crate) together with the patient's age, and
//! produces a [`SafetyReport`]: every mention mapped to a canonical RxCUI,
//! every known pairwise interaction classified by severity, and every dose
//! checked against an age-banded reference range.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rx_verify::app::config::Config;
//! use rx_verify::dataset::ReferenceData;
//! use rx_verify::workflow::{VerificationRequest, Verifier};
//!
//! # async fn run() -> rx_verify::Result<()> {
//! let config = Config::default();
//! let reference = ReferenceData::load(&config.datasets)?;
//! let verifier = Verifier::from_config(&config, reference)?;
//!
//! let request = VerificationRequest::from_names(70, &["Aspirin", "Warfarin"]);
//! let report = verifier.verify(request).await;
//!
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`dataset`]: Load-once reference data (drug index, interactions, dosage table)
//! - [`normalize`]: Two-stage drug normalization (local index, then RxNav)
//! - [`interaction`]: Pairwise interaction resolution and severity classification
//! - [`dosage`]: Unit handling, frequency parsing and age-banded dose validation
//! - [`report`]: Immutable safety report assembly
//! - [`workflow`]: Verification requests and the end-to-end verifier
//! - [`app`]: CLI and configuration management
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Normalizer  │───▶│ Interaction │───▶│  Severity   │───┐
//! │ local/RxNav │    │  Resolver   │    │ Classifier  │   │   ┌─────────────┐
//! └─────────────┘    └─────────────┘    └─────────────┘   ├──▶│   Report    │
//!        │                                                │   │  Assembler  │
//!        └──────────────────▶ Dosage Validator ───────────┘   └─────────────┘
//! ```

pub mod dataset;
pub mod normalize;
pub mod interaction;
pub mod dosage;
pub mod report;
pub mod workflow;
pub mod app;

// Re-export commonly used types
pub use dataset::ReferenceData;
pub use dosage::types::{AgeBand, DosageFinding, DosageVerdict};
pub use interaction::types::{InteractionFinding, InteractionRecord, PairKey, Severity};
pub use normalize::types::{Confidence, Dose, DrugMention, NormalizedDrug, Resolution};
pub use report::{RiskLevel, SafetyReport};
pub use workflow::{VerificationRequest, Verifier};

/// Result type alias for rx-verify
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rx-verify
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Drug lookup service unavailable: {0}")]
    LookupUnavailable(String),

    #[error("Dataset missing: {0}")]
    DatasetMissing(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
