use std::sync::Arc;

use reposcope_llm::{EmbeddingProvider, LlmError};

use crate::pool::{CallTimeout, GroupScheduler};

impl From<CallTimeout> for LlmError {
    fn from(t: CallTimeout) -> Self {
        LlmError::Timeout(t.0.as_secs())
    }
}

/// Computes one embedding per text through a bounded scheduler.
pub struct EmbeddingGenerator<P: EmbeddingProvider> {
    provider: Arc<P>,
    scheduler: GroupScheduler,
}

impl<P: EmbeddingProvider> EmbeddingGenerator<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, scheduler: GroupScheduler) -> Self {
        Self {
            provider,
            scheduler,
        }
    }

    /// Output is index-aligned with `texts`; a failed call yields `Err` at
    /// its index and never aborts the batch. Failed calls are not retried.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Vec<Result<Vec<f32>, LlmError>> {
        let total = texts.len();
        let results = self
            .scheduler
            .run(texts, |text| async move { self.provider.embed(&text).await })
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        for (index, err) in results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
        {
            tracing::warn!(index, provider = self.provider.name(), "embedding failed: {err}");
        }
        tracing::info!(total, failed, "embedding batch complete");
        results
    }
}
