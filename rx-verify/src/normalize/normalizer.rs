//! Drug Normalizer
//!
//! Two-stage resolution of free-text mentions:
//!
//! 1. Local index: exact name, then the cleaned name
//! 2. Remote lookup service, bounded by a per-lookup timeout
//!
//! A mention neither stage can map becomes an unresolved drug with
//! confidence 0. Remote failures never propagate.

use crate::dataset::drug_index::{index_key, DrugIndex};
use crate::normalize::lookup::{DrugLookup, LookupOutcome};
use crate::normalize::types::{DrugMention, MatchKind, NormalizedDrug, UnresolvedReason};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default per-lookup timeout
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
/// Default number of concurrent remote lookups
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Parenthesised or bracketed hints, e.g. "(Tylenol)"
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex")
});

/// Strength tokens, e.g. "500 mg", "5mg/ml", "0.1%"
static STRENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:mg|mcg|µg|ug|g|ml|l|iu|units?|%)(?:/\s*(?:ml|\d+\s*ml))?(?:\b|$)")
        .expect("valid regex")
});

static DOSAGE_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:tab|tabs|tablet|tablets|cap|caps|capsule|capsules|inj|injection|syrup|suspension|solution|oral|cream|ointment|drops|er|sr|xr)\b",
    )
    .expect("valid regex")
});

/// Strip bracketed hints, strengths and dosage-form words from a mention.
///
/// Returns `None` when nothing is left or nothing changed, so callers never
/// repeat an identical lookup.
pub fn clean_name(text: &str) -> Option<String> {
    let without_brackets = BRACKETS.replace_all(text, " ");
    let without_strength = STRENGTH.replace_all(&without_brackets, " ");
    let without_forms = DOSAGE_FORM.replace_all(&without_strength, " ");
    let cleaned = index_key(&without_forms);

    if cleaned.is_empty() || cleaned == index_key(text) {
        None
    } else {
        Some(cleaned)
    }
}

/// Mention → canonical drug resolution
#[derive(Clone)]
pub struct DrugNormalizer {
    index: Arc<DrugIndex>,
    lookup: Option<Arc<dyn DrugLookup>>,
    lookup_timeout: Duration,
    max_concurrent: usize,
}

impl std::fmt::Debug for DrugNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrugNormalizer")
            .field("index_size", &self.index.len())
            .field("lookup", &self.lookup.as_ref().map(|l| l.service_name().to_string()))
            .field("lookup_timeout", &self.lookup_timeout)
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

impl DrugNormalizer {
    /// Local-only normalizer
    pub fn new(index: Arc<DrugIndex>) -> Self {
        Self {
            index,
            lookup: None,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DrugLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn has_remote_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// Local stage only: exact match, then cleaned-name match
    pub fn resolve_local(&self, mention: &DrugMention) -> Option<NormalizedDrug> {
        let text = mention.trimmed_text();

        if let Some(concept) = self.index.get(text) {
            return Some(NormalizedDrug::local(
                mention.clone(),
                concept.rxcui.clone(),
                concept.name.clone(),
                MatchKind::Exact,
            ));
        }

        let cleaned = clean_name(text)?;
        self.index.get(&cleaned).map(|concept| {
            NormalizedDrug::local(
                mention.clone(),
                concept.rxcui.clone(),
                concept.name.clone(),
                MatchKind::Cleaned,
            )
        })
    }

    /// Normalize a single mention.
    ///
    /// Fails only with `MalformedInput` for empty text; every lookup failure
    /// yields an unresolved drug instead.
    pub async fn normalize_one(&self, mention: DrugMention) -> crate::Result<NormalizedDrug> {
        validate_mention(&mention)?;
        if let Some(drug) = self.resolve_local(&mention) {
            debug!(mention = %mention.text, rxcui = ?drug.canonical_id(), "Resolved locally");
            return Ok(drug);
        }
        Ok(match &self.lookup {
            Some(lookup) => remote_resolve(lookup.clone(), mention, self.lookup_timeout).await,
            None => NormalizedDrug::unresolved(mention, UnresolvedReason::LookupDisabled),
        })
    }

    /// Normalize many mentions, one result per mention in input order.
    ///
    /// Local hits resolve immediately; each miss runs its remote lookup as a
    /// separate task, at most `max_concurrent` at a time.
    pub async fn normalize_all(&self, mentions: Vec<DrugMention>) -> Vec<crate::Result<NormalizedDrug>> {
        enum Slot {
            Ready(crate::Result<NormalizedDrug>),
            Pending(DrugMention, JoinHandle<NormalizedDrug>),
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut slots = Vec::with_capacity(mentions.len());
        let mut remote_count = 0usize;

        for mention in mentions {
            if let Err(e) = validate_mention(&mention) {
                slots.push(Slot::Ready(Err(e)));
                continue;
            }
            if let Some(drug) = self.resolve_local(&mention) {
                debug!(mention = %mention.text, rxcui = ?drug.canonical_id(), "Resolved locally");
                slots.push(Slot::Ready(Ok(drug)));
                continue;
            }
            let Some(lookup) = self.lookup.clone() else {
                slots.push(Slot::Ready(Ok(NormalizedDrug::unresolved(
                    mention,
                    UnresolvedReason::LookupDisabled,
                ))));
                continue;
            };

            remote_count += 1;
            let sem = semaphore.clone();
            let timeout = self.lookup_timeout;
            let task_mention = mention.clone();
            let handle = tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        return NormalizedDrug::unresolved(
                            task_mention,
                            UnresolvedReason::LookupUnavailable("lookup pool closed".to_string()),
                        )
                    }
                };
                remote_resolve(lookup, task_mention, timeout).await
            });
            slots.push(Slot::Pending(mention, handle));
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(result) => results.push(result),
                Slot::Pending(mention, handle) => match handle.await {
                    Ok(drug) => results.push(Ok(drug)),
                    Err(e) => {
                        warn!(mention = %mention.text, error = %e, "Remote lookup task failed");
                        results.push(Ok(NormalizedDrug::unresolved(
                            mention,
                            UnresolvedReason::LookupUnavailable(format!("lookup task failed: {}", e)),
                        )));
                    }
                },
            }
        }

        let resolved = results.iter().filter(|r| matches!(r, Ok(d) if d.is_resolved())).count();
        info!(total = results.len(), resolved, remote = remote_count, "Normalization complete");
        results
    }
}

fn validate_mention(mention: &DrugMention) -> crate::Result<()> {
    if mention.trimmed_text().is_empty() {
        return Err(crate::Error::MalformedInput("drug mention text is empty".to_string()));
    }
    Ok(())
}

async fn remote_resolve(lookup: Arc<dyn DrugLookup>, mention: DrugMention, timeout: Duration) -> NormalizedDrug {
    let query = clean_name(mention.trimmed_text()).unwrap_or_else(|| mention.trimmed_text().to_string());

    match tokio::time::timeout(timeout, lookup.lookup(&query)).await {
        Ok(Ok(LookupOutcome::Found { rxcui, name, matched })) => {
            debug!(mention = %mention.text, rxcui = %rxcui, service = lookup.service_name(), "Resolved remotely");
            NormalizedDrug::remote(mention, rxcui, name, matched)
        }
        Ok(Ok(LookupOutcome::NotFound)) => {
            debug!(mention = %mention.text, "No concept found");
            NormalizedDrug::unresolved(mention, UnresolvedReason::NotFound)
        }
        Ok(Err(e)) => {
            warn!(mention = %mention.text, error = %e, "Remote lookup failed, marking unresolved");
            NormalizedDrug::unresolved(mention, UnresolvedReason::LookupUnavailable(e.to_string()))
        }
        Err(_) => {
            warn!(mention = %mention.text, timeout = ?timeout, "Remote lookup timed out, marking unresolved");
            NormalizedDrug::unresolved(
                mention,
                UnresolvedReason::LookupUnavailable(format!("timed out after {} ms", timeout.as_millis())),
            )
        }
    }
}
