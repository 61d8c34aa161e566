use docbot_core::error::AppError;

/// Maps text to vectors. An index stores the provider identity it was built
/// with; vectors from different providers or models never mix.
pub trait Embedder {
    /// Stable identifier recorded in the index, e.g.
    /// `openai:text-embedding-3-small`.
    fn provider_id(&self) -> String;

    /// Embed a batch in input order: one vector per input, all the same
    /// dimensionality. How inputs are grouped into batches must not affect
    /// the resulting vectors.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError>;

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let mut vectors = self.embed_batch(&[input])?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(AppError::new(
                "EMBEDDINGS_FAILED",
                "Provider returned the wrong number of vectors",
            )),
        }
    }
}

pub mod openai_embed;
