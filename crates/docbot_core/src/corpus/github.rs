use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

use super::model::{normalize_text, CorpusSource, Document};

/// Produces the full corpus for a source in one call. Trait seam so tests
/// and alternate hosts can stand in for the real repository.
pub trait CorpusFetcher {
    fn fetch(&self) -> Result<Vec<Document>, AppError>;
}

/// Single files larger than this are treated like binaries and skipped.
const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Fetches every blob of a GitHub repository tree at a pinned branch:
/// one recursive tree listing, then one raw-content request per file.
#[derive(Debug, Clone)]
pub struct GithubFetcher {
    source: CorpusSource,
    api_base: String,
    raw_base: String,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GithubFetcher {
    pub fn new(source: CorpusSource, token: Option<String>) -> Self {
        Self {
            source,
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            token,
        }
    }

    /// Point both endpoints at another host (mirrors, tests).
    pub fn with_bases(mut self, api_base: &str, raw_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.raw_base = raw_base.trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> ureq::Request {
        let req = ureq::get(url)
            .timeout(Duration::from_secs(30))
            .set("User-Agent", "docbot");
        match &self.token {
            Some(t) => req.set("Authorization", &format!("Bearer {t}")),
            None => req,
        }
    }

    fn list_tree(&self) -> Result<Vec<TreeEntry>, AppError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, self.source.owner, self.source.repo, self.source.branch
        );
        let resp = self
            .get(&url)
            .set("Accept", "application/vnd.github+json")
            .call();

        match resp {
            Ok(r) => {
                let v: TreeResponse = r.into_json().map_err(|e| {
                    AppError::new("CORPUS_FETCH_FAILED", "Failed to decode repository tree")
                        .with_details(format!("url={url}; err={e}"))
                })?;
                if v.truncated {
                    tracing::warn!(
                        source = %self.source.label(),
                        "repository tree listing was truncated; corpus will be partial"
                    );
                }
                Ok(v.tree.into_iter().filter(|e| e.kind == "blob").collect())
            }
            Err(ureq::Error::Status(status, r)) => Err(status_error(
                "Repository tree request failed",
                &format!("url={url}"),
                status,
                r,
            )),
            Err(e) => Err(
                AppError::new("CORPUS_FETCH_FAILED", "Failed to reach repository host")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }

    fn fetch_blob(&self, path: &str) -> Result<Vec<u8>, AppError> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, self.source.owner, self.source.repo, self.source.branch, path
        );
        let resp = self.get(&url).call();

        match resp {
            Ok(r) => {
                let mut bytes = Vec::new();
                r.into_reader()
                    // One past the cap so oversized files are detectable.
                    .take(MAX_FILE_BYTES as u64 + 1)
                    .read_to_end(&mut bytes)
                    .map_err(|e| {
                        AppError::new("CORPUS_FETCH_FAILED", "Failed to read file content")
                            .with_details(format!("path={path}; err={e}"))
                            .with_retryable(true)
                    })?;
                Ok(bytes)
            }
            Err(ureq::Error::Status(status, r)) => Err(status_error(
                "File content request failed",
                &format!("path={path}"),
                status,
                r,
            )),
            Err(e) => Err(
                AppError::new("CORPUS_FETCH_FAILED", "Failed to reach repository host")
                    .with_details(format!("path={path}; err={e}"))
                    .with_retryable(true),
            ),
        }
    }
}

impl CorpusFetcher for GithubFetcher {
    fn fetch(&self) -> Result<Vec<Document>, AppError> {
        let entries = self.list_tree()?;
        tracing::info!(
            source = %self.source.label(),
            files = entries.len(),
            "fetching corpus files"
        );

        let mut documents = Vec::new();
        let mut skipped = 0usize;
        for entry in &entries {
            let bytes = self.fetch_blob(&entry.path)?;
            if bytes.len() > MAX_FILE_BYTES {
                skipped += 1;
                tracing::warn!(path = %entry.path, "skipping oversized file");
                continue;
            }
            match decode_text(&bytes) {
                Some(content) => {
                    documents.push(Document::new(&self.source, entry.path.clone(), content));
                }
                None => {
                    skipped += 1;
                    tracing::warn!(path = %entry.path, "skipping undecodable file");
                }
            }
        }

        tracing::info!(kept = documents.len(), skipped, "corpus fetch complete");
        Ok(documents)
    }
}

/// Decode blob bytes as normalized UTF-8 text. `None` means binary content:
/// invalid UTF-8 or an embedded NUL.
fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(normalize_text(s)),
        Err(_) => None,
    }
}

fn status_error(message: &str, context: &str, status: u16, resp: ureq::Response) -> AppError {
    let body = resp.into_string().unwrap_or_default();
    let snippet: String = body.trim().chars().take(200).collect();
    AppError::new("CORPUS_FETCH_FAILED", message)
        .with_details(format!("{context}; status={status}; body={snippet}"))
}
