use std::fs;
use std::path::{Path, PathBuf};

use docbot_core::error::AppError;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::chunk::Chunk;
use crate::embed::Embedder;
use crate::retrieve::similarity;

/// One embedded chunk. `(parent_id, chunk_index)` identifies the chunk it
/// came from; `text` is carried verbatim so retrieval needs no second store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub parent_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// In-memory search index. Records keep chunk production order, which is
/// also the tie-break order for equal scores; all vectors share `dims` and
/// came from the `provider` identity recorded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    pub provider: String,
    pub dims: u32,
    pub records: Vec<EmbeddingRecord>,
}

impl VectorIndex {
    /// Top-k records by cosine similarity, descending; equal scores keep
    /// insertion order. `k` past the end returns everything ranked; an
    /// empty index returns empty rather than erroring.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<&EmbeddingRecord>, AppError> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() as u32 != self.dims {
            return Err(AppError::new(
                "RETRIEVAL_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!(
                "index_dims={}; query_dims={}",
                self.dims,
                query.len()
            )));
        }
        let qnorm = similarity::l2_norm(query);
        if qnorm == 0.0 {
            return Err(AppError::new(
                "RETRIEVAL_FAILED",
                "Query embedding norm is zero",
            ));
        }

        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(self.records.len());
        for (pos, rec) in self.records.iter().enumerate() {
            let vnorm = similarity::l2_norm(&rec.vector);
            if vnorm == 0.0 {
                continue;
            }
            scored.push((pos, similarity::cosine_similarity(query, &rec.vector, qnorm, vnorm)));
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored.into_iter().map(|(pos, _)| &self.records[pos]).collect())
    }
}

/// Persisted beside the records; enough to validate a loaded index and to
/// tell which corpus snapshot it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub provider: String,
    pub dims: u32,
    pub record_count: u32,
    pub corpus_fingerprint: String,
    pub built_at: String,
}

/// Owns index persistence under one directory: `index_meta.json` plus
/// `index_records.json`, written atomically and only after every embedding
/// succeeded.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join("index_meta.json")
    }

    fn records_path(&self) -> PathBuf {
        self.root.join("index_records.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root.as_path()).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn is_cached(&self) -> bool {
        self.meta_path().exists() && self.records_path().exists()
    }

    pub fn status(&self) -> Result<Option<IndexMeta>, AppError> {
        if !self.meta_path().exists() {
            return Ok(None);
        }
        Ok(Some(self.read_meta()?))
    }

    pub fn clear(&self) -> Result<(), AppError> {
        for path in [self.meta_path(), self.records_path()] {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    AppError::new("INDEX_BUILD_FAILED", "Failed to remove index file")
                        .with_details(format!("path={}; err={}", path.display(), e))
                })?;
            }
        }
        Ok(())
    }

    /// Warm path when cached, cold build otherwise. `chunks` is a closure so
    /// a warm run never pays for chunking at all; on a warm hit whose meta
    /// records a different corpus fingerprint, the staleness is logged and
    /// the cache still wins.
    pub fn load_or_build(
        &self,
        embedder: &dyn Embedder,
        corpus_fingerprint: &str,
        chunks: impl FnOnce() -> Vec<Chunk>,
    ) -> Result<VectorIndex, AppError> {
        if self.is_cached() {
            let (index, meta) = self.load()?;
            if meta.corpus_fingerprint != corpus_fingerprint {
                tracing::warn!(
                    index_snapshot = %meta.corpus_fingerprint,
                    corpus_snapshot = %corpus_fingerprint,
                    "index was built from a different corpus snapshot; delete the index cache to rebuild"
                );
            }
            tracing::info!(records = index.records.len(), "loaded vector index from cache");
            return Ok(index);
        }

        let chunks = chunks();
        tracing::info!(chunks = chunks.len(), "no index cache; embedding corpus");
        self.build(&chunks, embedder, corpus_fingerprint)
    }

    /// Cold build: embed every chunk (the embedder batches internally),
    /// assemble the index, persist it, return it. Nothing is written unless
    /// the whole build succeeded.
    pub fn build(
        &self,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        corpus_fingerprint: &str,
    ) -> Result<VectorIndex, AppError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(AppError::new(
                "INDEX_BUILD_FAILED",
                "Embedding count does not match chunk count",
            )
            .with_details(format!(
                "chunks={}; vectors={}",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut dims: Option<u32> = None;
        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let this_dims = vector.len() as u32;
            match dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={d}; got={this_dims}; parent_id={}; chunk_index={}",
                        chunk.parent_id, chunk.index
                    )));
                }
                Some(_) => {}
                None => dims = Some(this_dims),
            }
            records.push(EmbeddingRecord {
                parent_id: chunk.parent_id.clone(),
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                vector,
            });
        }

        let index = VectorIndex {
            provider: embedder.provider_id(),
            dims: dims.unwrap_or(0),
            records,
        };
        self.save(&index, corpus_fingerprint)?;
        tracing::info!(
            records = index.records.len(),
            dims = index.dims,
            provider = %index.provider,
            "vector index built"
        );
        Ok(index)
    }

    /// Persist an index: records first, meta last, each atomically, so a
    /// meta file never refers to missing records.
    pub fn save(&self, index: &VectorIndex, corpus_fingerprint: &str) -> Result<IndexMeta, AppError> {
        self.ensure_dirs()?;
        let meta = IndexMeta {
            provider: index.provider.clone(),
            dims: index.dims,
            record_count: index.records.len() as u32,
            corpus_fingerprint: corpus_fingerprint.to_string(),
            built_at: now_rfc3339_utc()?,
        };
        self.write_records(&index.records)?;
        self.write_meta(&meta)?;
        Ok(meta)
    }

    /// Reconstruct the persisted index, validating that meta and records
    /// still agree.
    pub fn load(&self) -> Result<(VectorIndex, IndexMeta), AppError> {
        let meta = self.read_meta()?;
        let records = self.read_records()?;

        if records.len() as u32 != meta.record_count {
            return Err(AppError::new(
                "INDEX_CACHE_CORRUPT",
                "Index meta and records disagree; delete the index cache to rebuild",
            )
            .with_details(format!(
                "meta_count={}; record_count={}",
                meta.record_count,
                records.len()
            )));
        }
        for rec in &records {
            if rec.vector.len() as u32 != meta.dims {
                return Err(AppError::new(
                    "INDEX_CACHE_CORRUPT",
                    "Index record dims do not match meta; delete the index cache to rebuild",
                )
                .with_details(format!(
                    "parent_id={}; chunk_index={}; expected={}; got={}",
                    rec.parent_id,
                    rec.chunk_index,
                    meta.dims,
                    rec.vector.len()
                )));
            }
        }

        let index = VectorIndex {
            provider: meta.provider.clone(),
            dims: meta.dims,
            records,
        };
        Ok((index, meta))
    }

    fn read_meta(&self) -> Result<IndexMeta, AppError> {
        let path = self.meta_path();
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("INDEX_CACHE_CORRUPT", "Failed to read index meta")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new(
                "INDEX_CACHE_CORRUPT",
                "Failed to decode index meta; delete the index cache to rebuild",
            )
            .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    fn read_records(&self) -> Result<Vec<EmbeddingRecord>, AppError> {
        let path = self.records_path();
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("INDEX_CACHE_CORRUPT", "Failed to read index records")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new(
                "INDEX_CACHE_CORRUPT",
                "Failed to decode index records; delete the index cache to rebuild",
            )
            .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    fn write_meta(&self, meta: &IndexMeta) -> Result<(), AppError> {
        let path = self.meta_path();
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(meta).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode index meta")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to write index meta")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index meta write")
                .with_details(format!(
                    "tmp={}; dest={}; err={}",
                    tmp.display(),
                    path.display(),
                    e
                ))
        })
    }

    fn write_records(&self, records: &[EmbeddingRecord]) -> Result<(), AppError> {
        let path = self.records_path();
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string(records).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode index records")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to write index records")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index records write")
                .with_details(format!(
                    "tmp={}; dest={}; err={}",
                    tmp.display(),
                    path.display(),
                    e
                ))
        })
    }
}

fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to format build timestamp")
            .with_details(e.to_string())
    })
}
