//! Query-time similarity retrieval.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use reposcope_llm::EmbeddingProvider;
use reposcope_memory::{VectorFilter, VectorStore};

use crate::error::{IndexError, Result};
use crate::pool::bounded;
use crate::upserter::{CONTENT_FIELD, REPO_KEY_FIELD};

pub struct ContextRetriever<P: EmbeddingProvider> {
    provider: Arc<P>,
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_timeout: Option<Duration>,
    store_timeout: Option<Duration>,
}

impl<P: EmbeddingProvider> ContextRetriever<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            provider,
            store,
            collection: collection.into(),
            embed_timeout: None,
            store_timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, embed: Option<Duration>, store: Option<Duration>) -> Self {
        self.embed_timeout = embed;
        self.store_timeout = store;
        self
    }

    /// Returns up to `top_k` chunk texts in the store's ranking order,
    /// searching across every indexed repository.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] if the query cannot be embedded and
    /// [`IndexError::Query`] if the similarity search fails.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        self.search(query, top_k, None).await
    }

    /// Like [`retrieve`](Self::retrieve), restricted to one repository.
    ///
    /// # Errors
    ///
    /// See [`retrieve`](Self::retrieve).
    pub async fn retrieve_scoped(
        &self,
        repo_key: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>> {
        self.search(
            query,
            top_k,
            Some(VectorFilter::text_equals(REPO_KEY_FIELD, repo_key)),
        )
        .await
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<VectorFilter>,
    ) -> Result<Vec<String>> {
        let vector = bounded(self.embed_timeout, async {
            self.provider.embed(query).await.map_err(IndexError::from)
        })
        .await?;

        let limit = u64::try_from(top_k).unwrap_or(u64::MAX);
        let hits = bounded(self.store_timeout, async {
            self.store
                .search(&self.collection, vector, limit, filter)
                .await
                .map_err(IndexError::Query)
        })
        .await?;

        let found = hits.len();
        let texts: Vec<String> = hits
            .into_iter()
            .filter_map(|hit| {
                hit.payload
                    .get(CONTENT_FIELD)
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
            .take(top_k)
            .collect();

        tracing::debug!(found, returned = texts.len(), top_k, "retrieved context");
        Ok(texts)
    }
}

/// Renders retrieved chunks as an XML block for prompt injection. Empty input
/// renders as an empty string.
#[must_use]
pub fn format_as_context(chunks: &[String]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut out = String::from("<repository_context>\n");
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out, "  <chunk rank=\"{}\">", i + 1);
        out.push_str(chunk);
        out.push_str("\n  </chunk>\n");
    }
    out.push_str("</repository_context>");
    out
}
