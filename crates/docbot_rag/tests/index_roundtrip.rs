use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use docbot_core::corpus::{CorpusSource, Document};
use docbot_core::error::AppError;
use docbot_rag::chunk::{Chunk, SplitConfig, TextSplitter};
use docbot_rag::embed::Embedder;
use docbot_rag::index::IndexStore;
use pretty_assertions::assert_eq;

/// Deterministic fake: a few cheap text features per input. Counts batch
/// calls so cache short-circuits are observable.
struct CountingEmbedder {
    batch_calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for CountingEmbedder {
    fn provider_id(&self) -> String {
        "fake:counting".to_string()
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|t| {
                let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                vec![t.len() as f32, vowels as f32, 1.0]
            })
            .collect())
    }
}

struct MixedDimsEmbedder;

impl Embedder for MixedDimsEmbedder {
    fn provider_id(&self) -> String {
        "fake:mixed".to_string()
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(inputs
            .iter()
            .enumerate()
            .map(|(i, _)| vec![1.0; 3 - (i % 2)])
            .collect())
    }
}

fn corpus_chunks() -> Vec<Chunk> {
    let source = CorpusSource::parse("acme/handbook", "main").expect("source");
    let docs = vec![
        Document::new(
            &source,
            "docs/routing.md",
            "Routing lets you navigate between views. Configure routes in the manifest. ".repeat(4),
        ),
        Document::new(
            &source,
            "docs/models.md",
            "Models hold application data and bind it to controls.",
        ),
    ];
    TextSplitter::new(SplitConfig {
        max_chars: 120,
        overlap: 24,
    })
    .expect("splitter")
    .split(&docs)
}

#[test]
fn save_then_load_reproduces_the_index_exactly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    let chunks = corpus_chunks();

    let built = store
        .build(&chunks, &embedder, "fingerprint-1")
        .expect("build");
    assert!(store.is_cached());
    assert_eq!(built.records.len(), chunks.len());
    assert_eq!(built.provider, "fake:counting");
    assert_eq!(built.dims, 3);

    let (loaded, meta) = store.load().expect("load");
    assert_eq!(built, loaded);
    assert_eq!(meta.provider, "fake:counting");
    assert_eq!(meta.dims, 3);
    assert_eq!(meta.record_count, chunks.len() as u32);
    assert_eq!(meta.corpus_fingerprint, "fingerprint-1");
    assert!(!meta.built_at.is_empty());
}

#[test]
fn warm_load_or_build_ignores_new_chunks_and_skips_embedding() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    let chunks = corpus_chunks();

    let built = store
        .load_or_build(&embedder, "fingerprint-1", || chunks.clone())
        .expect("cold build");
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

    // Warm run: different chunks on offer, none of them embedded.
    let other_chunk = Chunk {
        parent_id: "other".to_string(),
        index: 0,
        text: "entirely different corpus".to_string(),
        start_offset: 0,
    };
    let warm = store
        .load_or_build(&embedder, "fingerprint-1", move || vec![other_chunk])
        .expect("warm load");
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(built, warm);
}

#[test]
fn stale_fingerprint_still_serves_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    let chunks = corpus_chunks();

    let built = store
        .load_or_build(&embedder, "fingerprint-1", || chunks.clone())
        .expect("cold build");

    // The corpus changed underneath; the cache is authoritative until
    // someone deletes it, so the old index is returned as-is.
    let warm = store
        .load_or_build(&embedder, "fingerprint-2", || chunks.clone())
        .expect("warm load");
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(built, warm);
}

#[test]
fn mixed_dimensions_abort_the_build_and_leave_no_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let chunks = corpus_chunks();

    let err = store
        .build(&chunks, &MixedDimsEmbedder, "fingerprint-1")
        .expect_err("mixed dims should fail");
    assert_eq!(err.code, "INDEX_BUILD_FAILED");
    assert!(!store.is_cached());
}

#[test]
fn empty_chunk_list_builds_an_empty_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();

    let built = store.build(&[], &embedder, "fingerprint-1").expect("build");
    assert!(built.records.is_empty());

    let (loaded, meta) = store.load().expect("load");
    assert!(loaded.records.is_empty());
    assert_eq!(meta.record_count, 0);

    let hits = loaded.search(&[1.0, 0.0, 0.0], 3).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn unreadable_records_report_cache_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    store
        .build(&corpus_chunks(), &embedder, "fingerprint-1")
        .expect("build");

    fs::write(dir.path().join("index_records.json"), b"[oops").expect("write garbage");
    let err = store.load().expect_err("corrupt records should fail");
    assert_eq!(err.code, "INDEX_CACHE_CORRUPT");
}

#[test]
fn meta_and_records_disagreement_is_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    store
        .build(&corpus_chunks(), &embedder, "fingerprint-1")
        .expect("build");

    let meta_path = dir.path().join("index_meta.json");
    let raw = fs::read_to_string(&meta_path).expect("read meta");
    let mut meta: serde_json::Value = serde_json::from_str(&raw).expect("parse meta");
    meta["record_count"] = serde_json::json!(999);
    fs::write(&meta_path, serde_json::to_string(&meta).expect("encode")).expect("write back");

    let err = store.load().expect_err("disagreement should fail");
    assert_eq!(err.code, "INDEX_CACHE_CORRUPT");
}

#[test]
fn clear_forces_the_next_run_cold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let embedder = CountingEmbedder::new();
    let chunks = corpus_chunks();

    store
        .load_or_build(&embedder, "fingerprint-1", || chunks.clone())
        .expect("cold build");
    store.clear().expect("clear");
    assert!(!store.is_cached());
    assert!(store.status().expect("status").is_none());

    store
        .load_or_build(&embedder, "fingerprint-1", || chunks.clone())
        .expect("second cold build");
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 2);
}
