use docbot_core::error::AppError;

use crate::embed::Embedder;
use crate::index::VectorIndex;

pub(crate) mod similarity;

/// Ranked chunk texts for a question: embed the question with the same
/// provider the index was built with, then take the top-k cosine hits.
/// An empty index yields an empty result, never an error.
pub fn retrieve(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    question: &str,
    top_k: usize,
) -> Result<Vec<String>, AppError> {
    let q = question.trim();
    if q.is_empty() {
        return Err(AppError::new(
            "RETRIEVAL_FAILED",
            "Question must not be empty",
        ));
    }

    let provider = embedder.provider_id();
    if provider != index.provider {
        return Err(AppError::new(
            "RETRIEVAL_FAILED",
            "Embedder does not match the provider the index was built with",
        )
        .with_details(format!(
            "index={}; embedder={provider}",
            index.provider
        )));
    }

    if index.records.is_empty() {
        tracing::debug!("index is empty; retrieval returns no context");
        return Ok(Vec::new());
    }

    let qv = embedder.embed(q)?;
    let hits = index.search(&qv, top_k)?;
    tracing::debug!(hits = hits.len(), top_k, "retrieved context chunks");
    Ok(hits.into_iter().map(|r| r.text.clone()).collect())
}
