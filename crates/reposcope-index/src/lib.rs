//! Repository indexing pipeline: discovery, fetch, chunking, embedding,
//! vector upsert and similarity retrieval.

pub mod chunker;
pub mod discovery;
pub mod embedder;
pub mod error;
pub mod fetcher;
pub mod indexer;
pub mod policy;
pub mod pool;
pub mod report;
pub mod retriever;
pub mod upserter;

#[cfg(test)]
mod test_support;

pub use chunker::{Chunk, ChunkedFile, ChunkerConfig, ContinuationPolicy, chunk_file};
pub use discovery::FileDiscoverer;
pub use embedder::EmbeddingGenerator;
pub use error::{IndexError, Result};
pub use fetcher::{ContentFetcher, FetchOutcome, FileRecord};
pub use indexer::{CodebaseIndexer, IndexerConfig};
pub use policy::ExclusionPolicy;
pub use pool::{Backpressure, CallTimeout, GroupScheduler};
pub use report::{FailureStage, IndexReport, ItemFailure};
pub use retriever::{ContextRetriever, format_as_context};
pub use upserter::{EmbeddingResult, StoredVector, UpsertSummary, VectorUpserter, chunk_id};
