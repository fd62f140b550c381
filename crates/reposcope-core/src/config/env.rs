use serde::de::DeserializeOwned;

use super::Config;

/// Parses a lowercase enum name the same way the TOML file does.
fn parse_kind<T: DeserializeOwned>(v: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(v.to_owned())).ok()
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_backends();
        self.apply_env_overrides_index();
    }

    fn apply_env_overrides_backends(&mut self) {
        if let Ok(v) = std::env::var("REPOSCOPE_EMBEDDING_PROVIDER") {
            if let Some(kind) = parse_kind(&v) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid REPOSCOPE_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("REPOSCOPE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_EMBEDDING_MAX_RETRIES")
            && let Ok(n) = v.parse::<u32>()
        {
            self.embedding.max_retries = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_VECTOR_BACKEND") {
            if let Some(kind) = parse_kind(&v) {
                self.vector_store.backend = kind;
            } else {
                tracing::warn!("ignoring invalid REPOSCOPE_VECTOR_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("REPOSCOPE_QDRANT_URL") {
            self.vector_store.url = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_SOURCE_BACKEND") {
            if let Some(kind) = parse_kind(&v) {
                self.source.backend = kind;
            } else {
                tracing::warn!("ignoring invalid REPOSCOPE_SOURCE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("REPOSCOPE_GITHUB_API_BASE") {
            self.source.api_base = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_SOURCE_ROOT") {
            self.source.root = v;
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_MAX_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.max_chunk_size = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_MAX_CHUNKS_PER_FILE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.max_chunks_per_file = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_FETCH_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.fetch_batch_size = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_EMBED_CONCURRENCY")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.embed_concurrency = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_UPSERT_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.upsert_batch_size = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_BACKPRESSURE") {
            if let Some(mode) = parse_kind(&v) {
                self.index.backpressure = mode;
            } else {
                tracing::warn!("ignoring invalid REPOSCOPE_INDEX_BACKPRESSURE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_SKIP_UNCHANGED")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.index.skip_unchanged = enabled;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_INDEX_PRUNE_STALE")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.index.prune_stale = enabled;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_RETRIEVAL_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retrieval.top_k = n;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_TIMEOUT_SOURCE")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.source_seconds = secs;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_TIMEOUT_STORE")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.store_seconds = secs;
        }
    }
}
