//! Batched persistence of embedded chunks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reposcope_memory::vector_store::BoxFuture;
use reposcope_memory::{VectorPoint, VectorStore, VectorStoreError};

use crate::chunker::Chunk;
use crate::error::{IndexError, Result};
use crate::pool::bounded;

pub const REPO_KEY_FIELD: &str = "repo_key";
pub const PATH_FIELD: &str = "path";
pub const CONTENT_FIELD: &str = "content";
pub const CHUNK_ID_FIELD: &str = "chunk_id";
pub const CONTENT_HASH_FIELD: &str = "content_hash";

/// Deterministic vector id: `{repo_key}-{path with '/' as '_'}-{part_index}`.
#[must_use]
pub fn chunk_id(repo_key: &str, path: &str, part_index: usize) -> String {
    format!("{repo_key}-{}-{part_index}", path.replace('/', "_"))
}

#[must_use]
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// A chunk paired with its embedding; `None` marks a failed embedding call.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub chunk: Chunk,
    pub vector: Option<Vec<f32>>,
}

/// The unit written to the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub id: String,
    pub values: Vec<f32>,
    pub repo_key: String,
    pub path: String,
    pub content: String,
}

impl StoredVector {
    #[must_use]
    pub fn new(repo_key: &str, chunk: Chunk, values: Vec<f32>) -> Self {
        Self {
            id: chunk_id(repo_key, &chunk.source_path, chunk.part_index),
            values,
            repo_key: repo_key.to_owned(),
            path: chunk.source_path,
            content: chunk.text,
        }
    }

    fn into_point(self) -> VectorPoint {
        let payload = HashMap::from([
            (REPO_KEY_FIELD.to_owned(), serde_json::Value::String(self.repo_key)),
            (PATH_FIELD.to_owned(), serde_json::Value::String(self.path)),
            (
                CONTENT_HASH_FIELD.to_owned(),
                serde_json::Value::String(content_hash(&self.content)),
            ),
            (CONTENT_FIELD.to_owned(), serde_json::Value::String(self.content)),
            (CHUNK_ID_FIELD.to_owned(), serde_json::Value::String(self.id.clone())),
        ]);
        VectorPoint {
            id: self.id,
            vector: self.values,
            payload,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    pub vectors: usize,
    pub batches: usize,
}

pub struct VectorUpserter {
    store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
    call_timeout: Option<Duration>,
}

impl VectorUpserter {
    /// A `batch_size` of 0 is treated as 1.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            collection: collection.into(),
            batch_size: batch_size.max(1),
            call_timeout: None,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Drops failed embeddings, then writes the rest in sequential batches.
    /// Makes no store call at all when nothing remains. Any store error
    /// aborts the remaining batches; batches already written stay written.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Upsert`] on the first failed store call and
    /// [`IndexError::Timeout`] if a call exceeds the configured timeout.
    pub async fn upsert(&self, repo_key: &str, results: Vec<EmbeddingResult>) -> Result<UpsertSummary> {
        let points: Vec<VectorPoint> = results
            .into_iter()
            .filter_map(|r| {
                r.vector
                    .map(|values| StoredVector::new(repo_key, r.chunk, values).into_point())
            })
            .collect();

        let Some(first) = points.first() else {
            tracing::debug!(repo = repo_key, "no embedded chunks, skipping upsert");
            return Ok(UpsertSummary::default());
        };

        let vector_size = u64::try_from(first.vector.len())
            .map_err(|e| IndexError::Config(format!("vector size: {e}")))?;
        self.call(0, self.store.ensure_collection(&self.collection, vector_size))
            .await?;

        let total = points.len();
        let mut summary = UpsertSummary::default();
        let mut iter = points.into_iter();
        loop {
            let batch: Vec<VectorPoint> = iter.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let size = batch.len();
            let batch_no = summary.batches;
            self.call(batch_no, self.store.upsert(&self.collection, batch))
                .await?;
            summary.batches += 1;
            summary.vectors += size;
            tracing::info!(
                repo = repo_key,
                batch = batch_no,
                progress = format_args!("{}/{total}", summary.vectors),
                "upserted batch"
            );
        }

        Ok(summary)
    }

    async fn call<T>(
        &self,
        batch: usize,
        fut: BoxFuture<'_, std::result::Result<T, VectorStoreError>>,
    ) -> Result<T> {
        bounded(self.call_timeout, async {
            fut.await
                .map_err(|source| IndexError::Upsert { batch, source })
        })
        .await
    }
}
