use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;

use super::github::CorpusFetcher;
use super::model::{corpus_fingerprint, CorpusSource, Document};

/// Warm snapshots older than this get a warning on load. The cache is still
/// served; deleting it is the only invalidation mechanism.
const STALE_AFTER_DAYS: i64 = 30;

/// Durable corpus snapshot: the documents plus enough metadata to detect a
/// mutated cache and to show how old it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub source: CorpusSource,
    pub fetched_at: String,
    pub fingerprint: String,
    pub documents: Vec<Document>,
}

/// Owns the corpus cache under one directory. Cold loads fetch the whole
/// corpus and persist it once; warm loads never touch the network.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    source: CorpusSource,
}

impl DocumentStore {
    pub fn open(root: PathBuf, source: CorpusSource) -> Self {
        Self { root, source }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.join("corpus.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root.as_path()).map_err(|e| {
            AppError::new("CORPUS_CACHE_FAILED", "Failed to create corpus cache directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot_path().exists()
    }

    pub fn clear(&self) -> Result<(), AppError> {
        let path = self.snapshot_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                AppError::new("CORPUS_CACHE_FAILED", "Failed to remove corpus snapshot")
                    .with_details(format!("path={}; err={}", path.display(), e))
            })?;
        }
        Ok(())
    }

    /// The documents, from cache when present, otherwise fetched and cached.
    pub fn load(&self, fetcher: &dyn CorpusFetcher) -> Result<Vec<Document>, AppError> {
        Ok(self.load_snapshot(fetcher)?.documents)
    }

    /// Like [`DocumentStore::load`], but keeps the snapshot metadata (the
    /// fingerprint feeds the index staleness check).
    ///
    /// Warm path: deserialize, verify the fingerprint, no remote call.
    /// Cold path: fetch everything, then persist once; a fetch failure
    /// leaves no cache behind.
    pub fn load_snapshot(&self, fetcher: &dyn CorpusFetcher) -> Result<CorpusSnapshot, AppError> {
        if self.is_cached() {
            let snap = self.read_snapshot()?;
            tracing::info!(
                source = %snap.source.label(),
                documents = snap.documents.len(),
                fetched_at = %snap.fetched_at,
                "loaded corpus from cache"
            );
            warn_if_old(&snap);
            return Ok(snap);
        }

        tracing::info!(source = %self.source.label(), "no corpus cache; fetching");
        let documents = fetcher.fetch()?;
        self.write_snapshot(documents)
    }

    /// Snapshot metadata without fetching; `None` when nothing is cached.
    pub fn snapshot(&self) -> Result<Option<CorpusSnapshot>, AppError> {
        if !self.is_cached() {
            return Ok(None);
        }
        Ok(Some(self.read_snapshot()?))
    }

    fn read_snapshot(&self) -> Result<CorpusSnapshot, AppError> {
        let path = self.snapshot_path();
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("CORPUS_CACHE_CORRUPT", "Failed to read corpus snapshot")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let snap: CorpusSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new(
                "CORPUS_CACHE_CORRUPT",
                "Failed to decode corpus snapshot; delete it to refetch",
            )
            .with_details(format!("path={}; err={}", path.display(), e))
        })?;

        let actual = corpus_fingerprint(&snap.documents);
        if actual != snap.fingerprint {
            return Err(AppError::new(
                "CORPUS_CACHE_CORRUPT",
                "Corpus snapshot fingerprint mismatch; delete it to refetch",
            )
            .with_details(format!(
                "path={}; recorded={}; actual={}",
                path.display(),
                snap.fingerprint,
                actual
            )));
        }
        Ok(snap)
    }

    fn write_snapshot(&self, documents: Vec<Document>) -> Result<CorpusSnapshot, AppError> {
        self.ensure_dirs()?;
        let snap = CorpusSnapshot {
            source: self.source.clone(),
            fetched_at: now_rfc3339_utc()?,
            fingerprint: corpus_fingerprint(&documents),
            documents,
        };

        let path = self.snapshot_path();
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(&snap).map_err(|e| {
            AppError::new("CORPUS_CACHE_FAILED", "Failed to encode corpus snapshot")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("CORPUS_CACHE_FAILED", "Failed to write corpus snapshot")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("CORPUS_CACHE_FAILED", "Failed to finalize corpus snapshot write")
                .with_details(format!(
                    "tmp={}; dest={}; err={}",
                    tmp.display(),
                    path.display(),
                    e
                ))
        })?;

        tracing::info!(
            path = %path.display(),
            documents = snap.documents.len(),
            "corpus snapshot written"
        );
        Ok(snap)
    }
}

fn warn_if_old(snap: &CorpusSnapshot) {
    if let Ok(fetched) = OffsetDateTime::parse(&snap.fetched_at, &Rfc3339) {
        let days = (OffsetDateTime::now_utc() - fetched).whole_days();
        if days >= STALE_AFTER_DAYS {
            tracing::warn!(days, "corpus snapshot is old; delete it to refetch");
        }
    }
}

fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("CORPUS_CACHE_FAILED", "Failed to format fetch timestamp")
            .with_details(e.to_string())
    })
}
