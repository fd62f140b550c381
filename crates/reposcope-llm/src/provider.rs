use std::future::Future;

use crate::error::LlmError;

/// A service that turns text into a fixed-dimensional vector.
///
/// Implementations must be cheap to share: the indexing path and the
/// retrieval path hold the same provider behind an `Arc`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    fn name(&self) -> &str;
}
