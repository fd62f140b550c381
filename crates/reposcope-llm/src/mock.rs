//! Test-only mock embedding provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct MockProvider {
    pub embedding: Vec<f32>,
    /// Exact-text overrides for `embedding`.
    pub vectors: HashMap<String, Vec<f32>>,
    /// Any text containing one of these markers fails.
    pub fail_markers: Vec<String>,
    pub fail_all: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            embedding: vec![0.1; 8],
            vectors: HashMap::new(),
            fail_markers: Vec::new(),
            fail_all: false,
            delay_ms: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_fail_marker(mut self, marker: impl Into<String>) -> Self {
        self.fail_markers.push(marker.into());
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Total `embed` calls observed, shared across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running `embed` calls.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for MockProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all || self.fail_markers.iter().any(|m| text.contains(m.as_str())) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.embedding.clone()))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
