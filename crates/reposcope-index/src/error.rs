use std::time::Duration;

use reposcope_llm::LlmError;
use reposcope_memory::VectorStoreError;
use reposcope_source::SourceError;

use crate::pool::CallTimeout;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A directory listing failed; discovery never returns a partial tree.
    #[error("discovery failed at '{path}': {source}")]
    Discovery {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("fetch failed for '{path}': {reason}")]
    Fetch { path: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),

    /// Earlier batches of the same run stay committed.
    #[error("upsert failed at batch {batch}: {source}")]
    Upsert {
        batch: usize,
        #[source]
        source: VectorStoreError,
    },

    #[error("query failed: {0}")]
    Query(#[source] VectorStoreError),

    #[error("vector store error: {0}")]
    Store(#[source] VectorStoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<CallTimeout> for IndexError {
    fn from(t: CallTimeout) -> Self {
        Self::Timeout(t.0)
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
