use std::sync::Arc;

use serde_json::{json, Value};

use super::{entry, fresh_store, word, FailingProvider, ReadOnlyStore, StubProvider};
use crate::import::{BulkImportPipeline, ImportBatchStats};
use crate::semantic::uniqueness::{ProviderFailurePolicy, UniquenessChecker};
use crate::vocabulary::{BackendCsv, VocabularyStore};

fn record(writing: &str, reading: &str, meaning: &str) -> Value {
    json!({"writing": writing, "reading": reading, "meaning": meaning})
}

fn cat_feline_provider(feline: Vec<f32>) -> Arc<StubProvider> {
    Arc::new(
        StubProvider::new()
            .with("cat", vec![1.0, 0.0, 0.0])
            .with("feline", feline),
    )
}

// --- scenarios ---

#[test]
fn similar_gloss_rejected_within_batch() {
    let (store, _tmp) = fresh_store();
    let checker = UniquenessChecker::new(cat_feline_provider(vec![0.999, 0.02, 0.0]));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[
        record("猫", "ねこ", "cat"),
        record("猫", "ねこ", "feline"),
    ]);

    assert_eq!(
        stats,
        ImportBatchStats {
            total_processed: 2,
            added: 1,
            similarity_rejected: 1,
            ..Default::default()
        }
    );
    let all = store.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].meaning, "cat");
}

#[test]
fn dissimilar_gloss_both_added() {
    let (store, _tmp) = fresh_store();
    let checker = UniquenessChecker::new(cat_feline_provider(vec![0.5, 0.5, 0.7]));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[
        record("猫", "ねこ", "cat"),
        record("猫", "ねこ", "feline"),
    ]);

    assert_eq!(stats.added, 2);
    assert_eq!(stats.similarity_rejected, 0);
    assert_eq!(store.all().unwrap().len(), 2);
    // new rows wait for the backfill
    assert!(store.embedded().unwrap().is_empty());
}

#[test]
fn exact_duplicate_within_batch() {
    let (store, _tmp) = fresh_store();
    let provider = Arc::new(StubProvider::new());
    let checker = UniquenessChecker::new(provider.clone());
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[record("犬", "いぬ", "dog"), record("犬", "いぬ", "dog")]);

    assert_eq!(stats.total_processed, 2);
    assert_eq!(stats.added, 1);
    assert_eq!(stats.exact_duplicates, 1);
    assert_eq!(provider.calls(), 0);
}

#[test]
fn existing_entries_loaded_once_at_start() {
    let (store, _tmp) = fresh_store();
    store.create(word("犬", "いぬ", "dog")).unwrap();

    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();
    assert_eq!(pipeline.known_entries().len(), 1);

    let stats = pipeline.import_batch(&[record("犬", "いぬ", "Dog "), record("猫", "ねこ", "cat")]);

    assert_eq!(stats.exact_duplicates, 1);
    assert_eq!(stats.added, 1);
    assert_eq!(pipeline.known_entries().len(), 2);
}

#[test]
fn malformed_candidates_counted_as_errors() {
    let (store, _tmp) = fresh_store();
    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[
        json!("猫"),
        json!({"writing": "猫", "meaning": "cat"}),
        json!({"japanese": "水", "reading": "みず", "english": "water"}),
        json!({"writing": "犬", "reading": "いぬ", "meaning": 5}),
    ]);

    assert_eq!(
        stats,
        ImportBatchStats {
            total_processed: 4,
            added: 1,
            errors: 3,
            ..Default::default()
        }
    );
}

#[test]
fn storage_failure_counted_as_error() {
    let store = Arc::new(ReadOnlyStore::new(vec![entry(0, "犬", "いぬ", "dog")]));
    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store).unwrap();

    let stats = pipeline.import_batch(&[record("犬", "いぬ", "dog"), record("猫", "ねこ", "cat")]);

    assert_eq!(stats.exact_duplicates, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.added, 0);
    // failed writes are not remembered
    assert_eq!(pipeline.known_entries().len(), 1);
}

// --- degraded provider ---

#[test]
fn provider_outage_admits_homographs_by_default() {
    let (store, _tmp) = fresh_store();
    let provider = Arc::new(FailingProvider::new());
    let checker = UniquenessChecker::new(provider.clone());
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[
        record("猫", "ねこ", "cat"),
        record("猫", "ねこ", "feline"),
    ]);

    assert_eq!(stats.added, 2);
    assert_eq!(stats.errors, 0);
    // only the homograph needed the provider
    assert_eq!(provider.calls(), 1);
}

#[test]
fn provider_outage_with_reject_policy_is_error() {
    let (store, _tmp) = fresh_store();
    let checker = UniquenessChecker::new(Arc::new(FailingProvider::new()))
        .with_failure_policy(ProviderFailurePolicy::Reject);
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let stats = pipeline.import_batch(&[
        record("猫", "ねこ", "cat"),
        record("猫", "ねこ", "feline"),
    ]);

    assert_eq!(stats.added, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(store.all().unwrap().len(), 1);
}

// --- invariants ---

#[test]
fn counters_always_balance() {
    let (store, _tmp) = fresh_store();
    store.create(word("水", "みず", "water")).unwrap();

    let provider = Arc::new(
        StubProvider::new()
            .with("to go up", vec![1.0, 0.0])
            .with("to raise", vec![0.999, 0.03])
            .with("to give", vec![0.1, 0.99]),
    );
    let checker = UniquenessChecker::new(provider);
    let mut pipeline = BulkImportPipeline::new(checker, store).unwrap();

    let batch = vec![
        record("上げる", "あげる", "to go up"),
        record("上げる", "あげる", "to raise"),
        record("上げる", "あげる", "to give"),
        record("上げる", "あげる", "to go up"),
        record("水", "みず", "WATER"),
        json!(null),
        record("赤", "あか", "red"),
        // no stub vector: skipped comparisons, still admitted
        record("上げる", "あげる", "to lift"),
    ];

    let stats = pipeline.import_batch(&batch);

    assert_eq!(stats.total_processed, batch.len());
    assert!(stats.is_balanced());
    assert_eq!(
        stats,
        ImportBatchStats {
            total_processed: 8,
            added: 4,
            exact_duplicates: 2,
            similarity_rejected: 1,
            errors: 1,
        }
    );
}

#[test]
fn empty_batch() {
    let (store, _tmp) = fresh_store();
    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store).unwrap();

    assert_eq!(pipeline.import_batch(&[]), ImportBatchStats::default());
}

// --- persistence ---

#[test]
fn large_batch_saves_in_chunks() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vocabulary.csv");
    let store = Arc::new(BackendCsv::load(&path).unwrap());

    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    let batch: Vec<Value> = (0..250)
        .map(|i| record(&format!("語{i}"), "ご", &format!("word {i}")))
        .collect();
    let stats = pipeline.import_batch(&batch);

    assert_eq!(stats.added, 250);
    // two full chunks and the remainder
    assert_eq!(store.save_count(), 3);
    assert_eq!(BackendCsv::load(&path).unwrap().all().unwrap().len(), 250);
}

#[test]
fn unsaved_additions_counted_as_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("store");
    let store = Arc::new(BackendCsv::load(dir.join("vocabulary.csv")).unwrap());

    let checker = UniquenessChecker::new(Arc::new(StubProvider::new()));
    let mut pipeline = BulkImportPipeline::new(checker, store.clone()).unwrap();

    // the final save has nowhere to go
    std::fs::remove_dir_all(&dir).unwrap();

    let stats = pipeline.import_batch(&[
        record("猫", "ねこ", "cat"),
        record("猫", "ねこ", "cat"),
        record("犬", "いぬ", "dog"),
    ]);

    assert_eq!(
        stats,
        ImportBatchStats {
            total_processed: 3,
            exact_duplicates: 1,
            errors: 2,
            ..Default::default()
        }
    );
    assert_eq!(store.save_count(), 0);
}
