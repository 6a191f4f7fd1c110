//! Criterion benchmarks for the verification hot paths
//!
//! Covers: pairwise interaction resolution, severity classification,
//! dosage validation and a full local-only verification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rx_verify::dataset::{DosageTable, DrugIndex, InteractionTable, ReferenceData};
use rx_verify::dosage::validator::DosageValidator;
use rx_verify::interaction::resolver::InteractionResolver;
use rx_verify::interaction::severity::SeverityClassifier;
use rx_verify::interaction::types::{InteractionRecord, Severity};
use rx_verify::normalize::types::{DrugMention, MatchKind, NormalizedDrug};
use rx_verify::workflow::{MentionInput, VerificationRequest, Verifier};
use std::sync::Arc;

/// Synthetic table where every consecutive pair of ids interacts
fn make_table(drugs: usize) -> InteractionTable {
    InteractionTable::from_records((0..drugs.saturating_sub(1)).map(|i| {
        InteractionRecord::new(i.to_string(), (i + 1).to_string(), "Synthetic interaction")
            .with_names(format!("drug{}", i), format!("drug{}", i + 1))
            .with_severity(if i % 3 == 0 { Severity::Low } else { Severity::Medium })
            .with_mechanism(if i % 5 == 0 { "Increased bleeding risk" } else { "Reduced absorption" })
    }))
}

fn make_drugs(count: usize) -> Vec<NormalizedDrug> {
    (0..count)
        .map(|i| {
            let name = format!("drug{}", i);
            NormalizedDrug::local(
                DrugMention::new(name.clone()).with_dose(100.0, "mg"),
                i.to_string(),
                name,
                MatchKind::Exact,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Interaction benchmarks
// ---------------------------------------------------------------------------

fn bench_resolve_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_pairs");

    for count in [5usize, 20, 50] {
        let resolver = InteractionResolver::new(Arc::new(make_table(count)));
        let drugs = make_drugs(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &drugs, |b, drugs| {
            b.iter(|| resolver.resolve(black_box(drugs)));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = SeverityClassifier::builtin();
    let drugs = make_drugs(2);
    let plain = InteractionRecord::new("0", "1", "Reduced absorption when taken together")
        .with_severity(Severity::Low);
    let keyword = InteractionRecord::new("0", "1", "Additive effects")
        .with_mechanism("Combined serotonergic activity may cause serotonin syndrome");

    c.bench_function("classify_no_keyword", |b| {
        b.iter(|| classifier.classify(black_box(&plain), &drugs[0], &drugs[1]));
    });
    c.bench_function("classify_keyword", |b| {
        b.iter(|| classifier.classify(black_box(&keyword), &drugs[0], &drugs[1]));
    });
}

// ---------------------------------------------------------------------------
// Dosage benchmarks
// ---------------------------------------------------------------------------

fn bench_validate_dosage(c: &mut Criterion) {
    let validator = DosageValidator::new(Arc::new(DosageTable::builtin()));
    let drugs: Vec<NormalizedDrug> = ["ibuprofen", "aspirin", "metformin", "digoxin"]
        .iter()
        .map(|name| {
            NormalizedDrug::local(
                DrugMention::new(*name).with_dose(0.2, "g").with_frequency("every 8 hours"),
                "0",
                *name,
                MatchKind::Exact,
            )
        })
        .collect();

    c.bench_function("validate_dosage", |b| {
        b.iter(|| validator.validate_all(black_box(&drugs), 70));
    });
}

// ---------------------------------------------------------------------------
// End-to-end benchmark
// ---------------------------------------------------------------------------

fn bench_verify_local(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let verifier = Verifier::new(ReferenceData::new(
        DrugIndex::empty(),
        InteractionTable::sample(),
        DosageTable::builtin(),
    ));
    let request = VerificationRequest::new(70)
        .with_mention(MentionInput::new("Warfarin 5mg tablet").with_dose_text("5 mg"))
        .with_mention(MentionInput::new("Aspirin").with_dose_text("81 mg"))
        .with_mention(MentionInput::new("Amoxicillin").with_dose_text("500 mg").with_frequency("tid"))
        .with_mention(MentionInput::new("Digoxin").with_dose_text("125 mcg"))
        .with_mention(MentionInput::new("Furosemide").with_dose_text("40 mg"));

    c.bench_function("verify_local", |b| {
        b.iter(|| runtime.block_on(verifier.verify(black_box(request.clone()))));
    });
}

criterion_group!(
    benches,
    bench_resolve_pairs,
    bench_classify,
    bench_validate_dosage,
    bench_verify_local,
);
criterion_main!(benches);
