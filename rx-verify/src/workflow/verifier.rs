//! Verifier
//!
//! Runs one request through the whole pipeline:
//!
//! ```text
//! mentions ─▶ normalize ─┬─▶ resolve pairs ─▶ classify ─┐
//!                        └─▶ validate doses ────────────┴─▶ assemble report
//! ```
//!
//! Per-mention problems become rejections or unresolved drugs; a request
//! always produces a report.

use crate::app::config::Config;
use crate::dataset::ReferenceData;
use crate::dosage::validator::DosageValidator;
use crate::interaction::resolver::InteractionResolver;
use crate::interaction::severity::SeverityClassifier;
use crate::normalize::lookup::DrugLookup;
use crate::normalize::normalizer::DrugNormalizer;
use crate::normalize::rxnav::RxNavClient;
use crate::normalize::types::DrugMention;
use crate::report::assembler::{ReportAssembler, ReportParts};
use crate::report::types::{RejectedMention, SafetyReport};
use crate::workflow::request::VerificationRequest;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// End-to-end prescription verifier.
///
/// Cheap to clone; all reference data is shared.
#[derive(Debug, Clone)]
pub struct Verifier {
    reference: ReferenceData,
    normalizer: DrugNormalizer,
    resolver: InteractionResolver,
    classifier: Arc<SeverityClassifier>,
    validator: DosageValidator,
    assembler: ReportAssembler,
}

impl Verifier {
    /// Local-only verifier with the built-in severity categories
    pub fn new(reference: ReferenceData) -> Self {
        Self {
            normalizer: DrugNormalizer::new(reference.drugs.clone()),
            resolver: InteractionResolver::new(reference.interactions.clone()),
            classifier: Arc::new(SeverityClassifier::builtin()),
            validator: DosageValidator::new(reference.dosage.clone()),
            assembler: ReportAssembler::new(),
            reference,
        }
    }

    /// Verifier wired from configuration, with RxNav lookup when enabled
    pub fn from_config(config: &Config, reference: ReferenceData) -> crate::Result<Self> {
        let classifier = SeverityClassifier::new(config.severity.default_tier, &config.severity.categories)?;
        let mut verifier = Self::new(reference).with_classifier(classifier);

        verifier.normalizer = verifier
            .normalizer
            .with_timeout(Duration::from_millis(config.lookup.timeout_ms))
            .with_max_concurrent(config.lookup.max_concurrent);

        if config.lookup.enabled {
            let client = RxNavClient::from_config(&config.lookup)?;
            info!(base_url = %client.base_url(), "Remote drug lookup enabled");
            verifier = verifier.with_lookup(Arc::new(client));
        } else {
            info!("Remote drug lookup disabled");
        }
        Ok(verifier)
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DrugLookup>) -> Self {
        self.normalizer = self.normalizer.with_lookup(lookup);
        self
    }

    pub fn with_classifier(mut self, classifier: SeverityClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.normalizer = self.normalizer.with_timeout(timeout);
        self
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn normalizer(&self) -> &DrugNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    /// Verify one request
    pub async fn verify(&self, request: VerificationRequest) -> SafetyReport {
        let VerificationRequest {
            patient_age,
            weight_kg,
            mentions,
        } = request;
        let mut rejected = Vec::new();
        let mut accepted: Vec<DrugMention> = Vec::with_capacity(mentions.len());

        for input in mentions {
            let text = input.text.clone();
            match input.into_mention() {
                Ok(mention) => accepted.push(mention),
                Err(e) => {
                    warn!(mention = %text, error = %e, "Rejected drug mention");
                    rejected.push(RejectedMention {
                        text,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let texts: Vec<String> = accepted.iter().map(|m| m.text.clone()).collect();
        let mut drugs = Vec::with_capacity(accepted.len());
        for (text, result) in texts.into_iter().zip(self.normalizer.normalize_all(accepted).await) {
            match result {
                Ok(drug) => drugs.push(drug),
                Err(e) => {
                    warn!(mention = %text, error = %e, "Rejected drug mention");
                    rejected.push(RejectedMention {
                        text,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let outcome = self.resolver.resolve(&drugs);
        let findings = outcome
            .matches
            .into_iter()
            .map(|pair| self.classifier.finding(pair))
            .collect();
        let weight_kg = weight_kg.filter(|w| {
            let usable = w.is_finite() && *w > 0.0;
            if !usable {
                warn!(weight_kg = *w, "Ignoring unusable patient weight");
            }
            usable
        });
        let dosage_findings = self.validator.validate_all_weighted(&drugs, patient_age, weight_kg);

        self.assembler.assemble(ReportParts {
            patient_age,
            drugs,
            findings,
            dosage_findings,
            unable_to_check: outcome.unable_to_check,
            rejected,
        })
    }
}
