use std::time::Duration;

use docbot_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::openai::OpenAiClient;

use super::Embedder;

/// Chunks per `/embeddings` request. Bounds request size without changing
/// the vectors: the provider embeds each input independently.
const DEFAULT_MAX_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    max_batch: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_batch: DEFAULT_MAX_BATCH,
        }
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    fn embed_one_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError> {
        let req = EmbeddingsRequest {
            model: &self.model,
            input: inputs,
        };
        let resp = self
            .client
            .post("embeddings", Duration::from_secs(30))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new("EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) => {
                let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                    AppError::new("EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                        .with_details(e.to_string())
                })?;
                if v.data.len() != inputs.len() {
                    return Err(AppError::new(
                        "EMBEDDINGS_FAILED",
                        "Embeddings response size mismatch",
                    )
                    .with_details(format!(
                        "requested={}; returned={}",
                        inputs.len(),
                        v.data.len()
                    )));
                }
                let mut items = v.data;
                // The provider reports input positions explicitly; order by
                // them rather than trusting response order.
                items.sort_by_key(|it| it.index);
                let mut out = Vec::with_capacity(items.len());
                for it in items {
                    if it.embedding.is_empty() {
                        return Err(AppError::new(
                            "EMBEDDINGS_FAILED",
                            "Embeddings response contained an empty vector",
                        ));
                    }
                    out.push(it.embedding);
                }
                Ok(out)
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                let snippet: String = body.trim().chars().take(200).collect();
                Err(
                    AppError::new("EMBEDDINGS_FAILED", "Embeddings request failed")
                        .with_details(format!("status={status}; body={snippet}")),
                )
            }
            Err(e) => Err(
                AppError::new("EMBEDDINGS_FAILED", "Failed to call embeddings endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn provider_id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut out = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.max_batch) {
            out.extend(self.embed_one_batch(batch)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::EmbeddingsResponse;

    #[test]
    fn decodes_embeddings_payload_in_reported_order() {
        let json = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.25, 0.5]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 2.0]}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        }"#;
        let mut v: EmbeddingsResponse = serde_json::from_str(json).expect("decode");
        v.data.sort_by_key(|it| it.index);
        assert_eq!(v.data[0].embedding, vec![1.0, 2.0]);
        assert_eq!(v.data[1].embedding, vec![0.25, 0.5]);
    }
}
