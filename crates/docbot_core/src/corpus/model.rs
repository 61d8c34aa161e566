use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// A corpus location: one GitHub repository pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSource {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl CorpusSource {
    /// Parse `owner/name` plus a branch into a source.
    pub fn parse(repo: &str, branch: &str) -> Result<Self, AppError> {
        let mut parts = repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                if branch.trim().is_empty() {
                    return Err(AppError::new(
                        "CORPUS_SOURCE_INVALID",
                        "Branch must not be empty",
                    ));
                }
                Ok(Self {
                    owner: owner.to_string(),
                    repo: name.to_string(),
                    branch: branch.trim().to_string(),
                })
            }
            _ => Err(
                AppError::new("CORPUS_SOURCE_INVALID", "Repository must be `owner/name`")
                    .with_details(format!("repo={repo}")),
            ),
        }
    }

    /// Human-readable label, e.g. `SAP-docs/sapui5@main`.
    pub fn label(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// One text file of the corpus.
///
/// Identity is `source_path` within the repository; `id` is derived from it
/// and therefore stable across runs, so cached snapshots round-trip without
/// re-keying anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_path: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(
        source: &CorpusSource,
        source_path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let source_path = source_path.into();
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), source_path.clone());
        metadata.insert(
            "repository".to_string(),
            format!("{}/{}", source.owner, source.repo),
        );
        metadata.insert("branch".to_string(), source.branch.clone());
        Self {
            id: sha256_hex(source_path.as_bytes()),
            source_path,
            content: content.into(),
            metadata,
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Content fingerprint of a whole corpus: sha256 over the sorted
/// `path NUL content-hash` pairs. Stored beside every cache artifact so a
/// mutated snapshot, or an index built from an older corpus, is detectable
/// instead of silently trusted.
pub fn corpus_fingerprint(documents: &[Document]) -> String {
    let mut lines: Vec<String> = documents
        .iter()
        .map(|d| format!("{}\x00{}", d.source_path, sha256_hex(d.content.as_bytes())))
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}
