use docbot_core::corpus::{CorpusFetcher, DocumentStore};
use docbot_core::error::AppError;

use crate::chunk::TextSplitter;
use crate::embed::Embedder;
use crate::index::{IndexStore, VectorIndex};
use crate::llm::ChatModel;
use crate::prompt::PromptAssembler;
use crate::retrieve::retrieve;

/// The whole answer path stitched from explicitly injected stages:
/// corpus -> chunks -> index -> retrieval -> prompt -> completion.
///
/// Warm caches short-circuit the front of the pipeline: a cached corpus is
/// never refetched, and a cached index skips chunking and embedding
/// entirely. Any stage failure aborts the run with that stage's error code.
pub struct Pipeline<'a> {
    pub store: &'a DocumentStore,
    pub fetcher: &'a dyn CorpusFetcher,
    pub splitter: &'a TextSplitter,
    pub index_store: &'a IndexStore,
    pub embedder: &'a dyn Embedder,
    pub chat: &'a dyn ChatModel,
    pub assembler: &'a PromptAssembler,
    pub top_k: usize,
}

impl Pipeline<'_> {
    pub fn answer(&self, question: &str) -> Result<String, AppError> {
        let index = self.prepare_index()?;

        let retrieved = retrieve(&index, self.embedder, question, self.top_k)?;
        if retrieved.is_empty() {
            tracing::warn!("no context retrieved; answering from the model alone");
        }

        let messages = self.assembler.assemble(question, &retrieved);
        tracing::info!(retrieved = retrieved.len(), "requesting completion");
        self.chat.complete(&messages)
    }

    fn prepare_index(&self) -> Result<VectorIndex, AppError> {
        let snapshot = self.store.load_snapshot(self.fetcher)?;
        self.index_store
            .load_or_build(self.embedder, &snapshot.fingerprint, || {
                let chunks = self.splitter.split(&snapshot.documents);
                tracing::info!(
                    documents = snapshot.documents.len(),
                    chunks = chunks.len(),
                    "chunked corpus"
                );
                chunks
            })
    }
}
