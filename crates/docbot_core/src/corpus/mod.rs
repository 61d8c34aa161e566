pub mod github;
pub mod model;
pub mod store;

pub use github::{CorpusFetcher, GithubFetcher};
pub use model::{corpus_fingerprint, sha256_hex, CorpusSource, Document};
pub use store::{CorpusSnapshot, DocumentStore};
